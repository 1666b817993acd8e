//! Dot-path addressing inside a document (`db.pool.max`).

use crate::document::Document;
use crate::error::{ConfigError, Result};

/// Set the value at `dot_path`, replacing any existing leaf.
///
/// Every segment but the last must already resolve to an object; missing
/// intermediates are never created. Empty segments (`"db."`, `"a..b"`) are
/// rejected.
pub fn set_path(doc: &mut Document, dot_path: &str, value: Document) -> Result<()> {
    if dot_path.split('.').any(str::is_empty) {
        return Err(not_found(dot_path, ""));
    }

    let (parents, leaf) = match dot_path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, dot_path),
    };

    let mut current = doc;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        current = match current.get_mut(segment) {
            Some(next) if next.is_object() => next,
            _ => return Err(not_found(dot_path, segment)),
        };
    }

    match current.as_object_mut() {
        Some(map) => {
            map.insert(leaf.to_string(), value);
            Ok(())
        }
        None => Err(not_found(dot_path, leaf)),
    }
}

/// Look up the value at `dot_path`, traversing objects only.
pub fn get_path<'a>(doc: &'a Document, dot_path: &str) -> Option<&'a Document> {
    if dot_path.split('.').any(str::is_empty) {
        return None;
    }
    dot_path
        .split('.')
        .try_fold(doc, |node, segment| node.as_object()?.get(segment))
}

fn not_found(path: &str, segment: &str) -> ConfigError {
    ConfigError::PathNotFound {
        path: path.to_string(),
        segment: segment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_replaces_existing_leaf() {
        let mut doc = json!({"db": {"host": "old", "port": 1}});
        set_path(&mut doc, "db.host", json!("new")).unwrap();
        assert_eq!(doc, json!({"db": {"host": "new", "port": 1}}));
    }

    #[test]
    fn test_set_adds_missing_leaf() {
        let mut doc = json!({"db": {}});
        set_path(&mut doc, "db.timeout", json!(30)).unwrap();
        set_path(&mut doc, "top", json!(true)).unwrap();
        assert_eq!(doc, json!({"db": {"timeout": 30}, "top": true}));
    }

    #[test]
    fn test_missing_intermediate_is_not_created() {
        let mut doc = json!({"db": {}});
        let err = set_path(&mut doc, "cache.ttl", json!(5)).unwrap_err();
        assert!(matches!(err, ConfigError::PathNotFound { ref segment, .. } if segment == "cache"));
        assert_eq!(doc, json!({"db": {}}));
    }

    #[test]
    fn test_scalar_intermediate_fails() {
        let mut doc = json!({"db": {"host": "x"}});
        let err = set_path(&mut doc, "db.host.name", json!("y")).unwrap_err();
        assert!(matches!(err, ConfigError::PathNotFound { ref segment, .. } if segment == "host"));
    }

    #[test]
    fn test_non_object_root_fails() {
        let mut doc = json!([1, 2]);
        assert!(set_path(&mut doc, "a", json!(1)).is_err());
        assert!(set_path(&mut doc, "", json!(1)).is_err());
    }

    #[test]
    fn test_empty_segments_fail() {
        let mut doc = json!({"db": {"host": "x"}});
        for path in ["db.", ".db", "db..host", "."] {
            let err = set_path(&mut doc, path, json!(1)).unwrap_err();
            assert!(matches!(err, ConfigError::PathNotFound { ref segment, .. } if segment.is_empty()));
        }
        assert_eq!(doc, json!({"db": {"host": "x"}}));
    }

    #[test]
    fn test_get_path() {
        let doc = json!({"db": {"pool": {"max": 4}}, "list": [1]});
        assert_eq!(get_path(&doc, "db.pool.max"), Some(&json!(4)));
        assert_eq!(get_path(&doc, "db.pool"), Some(&json!({"max": 4})));
        assert_eq!(get_path(&doc, "db.missing"), None);
        assert_eq!(get_path(&doc, "list.0"), None);
        assert_eq!(get_path(&doc, ""), None);
        assert_eq!(get_path(&doc, "db."), None);
    }
}
