//! Class-label parsing and display formatting.

use std::path::Path;

use super::InferenceError;

/// Make a raw class name readable: every `_` becomes a space.
///
/// Total and idempotent: applying it twice gives the same result as once.
///
/// ```
/// use scene_classifier::classifier::humanize_label;
///
/// assert_eq!(humanize_label("airport_terminal"), "airport terminal");
/// assert_eq!(humanize_label("beach"), "beach");
/// ```
pub fn humanize_label(raw: &str) -> String {
    raw.replace('_', " ")
}

/// Extract the class name from one line of a labels file.
///
/// Accepted shapes:
///
/// | line                         | label              |
/// |------------------------------|--------------------|
/// | `beach`                      | `beach`            |
/// | `/a/airport_terminal 2`      | `airport_terminal` |
/// | `/b/bakery/shop 31`          | `bakery/shop`      |
///
/// The category-path prefix (`/<letter>/`) and a trailing index column are
/// dropped.  Blank lines and `#` comments yield `None`.
pub fn parse_label_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let name = line.split_whitespace().next()?;
    let name = match name.strip_prefix('/') {
        // "/a/abbey" → "abbey"
        Some(rest) => match rest.split_once('/') {
            Some((bucket, tail)) if bucket.chars().count() == 1 && !tail.is_empty() => tail,
            _ => rest,
        },
        None => name,
    };

    Some(name.to_string())
}

/// Parse a whole labels file body, keeping class order.
pub fn parse_labels(content: &str) -> Vec<String> {
    content.lines().filter_map(parse_label_line).collect()
}

/// Read and parse the labels file at `path`.
///
/// # Errors
///
/// [`InferenceError::Labels`] when the file cannot be read or contains no
/// labels.
pub fn load_labels(path: &Path) -> Result<Vec<String>, InferenceError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| InferenceError::Labels(format!("{}: {e}", path.display())))?;
    let labels = parse_labels(&content);
    if labels.is_empty() {
        return Err(InferenceError::Labels(format!(
            "{}: no labels found",
            path.display()
        )));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn humanize_replaces_every_underscore() {
        assert_eq!(humanize_label("a_b__c_"), "a b  c ");
        assert_eq!(humanize_label(""), "");
        assert!(!humanize_label("___").contains('_'));
    }

    #[test]
    fn humanize_is_idempotent() {
        for raw in ["", "beach", "ice_skating_rink", "_lead", "trail_", "a__b", "ski resort"] {
            let once = humanize_label(raw);
            assert_eq!(humanize_label(&once), once, "{raw:?}");
            assert_eq!(once.chars().count(), raw.chars().count());
        }
    }

    #[test]
    fn plain_line() {
        assert_eq!(parse_label_line("beach").as_deref(), Some("beach"));
    }

    #[test]
    fn places_category_line() {
        assert_eq!(
            parse_label_line("/a/airport_terminal 2").as_deref(),
            Some("airport_terminal")
        );
        assert_eq!(
            parse_label_line("/b/bakery/shop 31").as_deref(),
            Some("bakery/shop")
        );
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse_label_line("   "), None);
        assert_eq!(parse_label_line("# header"), None);
    }

    #[test]
    fn parse_labels_keeps_order() {
        let labels = parse_labels("/a/abbey 0\n\n/a/airfield 1\n/z/zen_garden 2\n");
        assert_eq!(labels, vec!["abbey", "airfield", "zen_garden"]);
    }

    #[test]
    fn load_labels_from_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "forest_path\nhighway\n").unwrap();
        assert_eq!(load_labels(&path).unwrap(), vec!["forest_path", "highway"]);
    }

    #[test]
    fn load_labels_missing_or_empty_file_errors() {
        let dir = tempdir().expect("temp dir");
        assert!(matches!(
            load_labels(&dir.path().join("missing.txt")),
            Err(InferenceError::Labels(_))
        ));

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "\n# nothing\n").unwrap();
        assert!(matches!(load_labels(&empty), Err(InferenceError::Labels(_))));
    }
}
