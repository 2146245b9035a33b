//! Derives flat `section/key` addresses from full item paths.
//!
//! Every item name is stripped of the configured path prefix; what remains
//! is the composite key. Stores whose values may encode a JSON object get
//! one extra step: the object is flattened into one entry per field, keyed
//! by the remainder's first path segment plus the field name.

use serde_json::Value;

use crate::error::{Result, SettingsError};

/// One `composite key -> value` pair bound for the result map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlattenedEntry {
    pub key: String,
    pub value: String,
}

/// The entries one remote item flattened into, and whether its value was a
/// composite JSON object.
#[derive(Debug)]
pub(crate) struct MappedItem {
    pub entries: Vec<FlattenedEntry>,
    pub composite: bool,
}

/// Builds the composite key a setting is looked up under.
pub(crate) fn composite_key(section: &str, key: &str) -> String {
    format!("{section}/{key}")
}

/// Maps one item's full name and resolved value to result-map entries.
///
/// With `composite` set, the value is tried as a JSON object first: an
/// object flattens into one entry per field under the remainder's first
/// path segment (anything deeper is dropped; composite secrets are
/// addressed by section plus field name alone). Anything that is not a
/// JSON object (malformed JSON, arrays, scalars) is kept as a single
/// entry with the raw string verbatim. That is a policy, not an error.
pub(crate) fn map_item(
    full_name: &str,
    path_prefix: &str,
    value: &str,
    composite: bool,
) -> Result<MappedItem> {
    let remainder = strip_path_prefix(full_name, path_prefix)?;

    if composite {
        if let Ok(Value::Object(fields)) = serde_json::from_str(value) {
            let section = remainder.split('/').next().unwrap_or(remainder);
            let entries = fields
                .into_iter()
                .map(|(subkey, subvalue)| FlattenedEntry {
                    key: composite_key(section, &subkey),
                    value: match subvalue {
                        Value::String(s) => s,
                        other => other.to_string(),
                    },
                })
                .collect();
            return Ok(MappedItem {
                entries,
                composite: true,
            });
        }
    }

    Ok(MappedItem {
        entries: vec![FlattenedEntry {
            key: remainder.to_string(),
            value: value.to_string(),
        }],
        composite: false,
    })
}

/// Strips the configured prefix, then at most one leading separator, so
/// prefixes with and without a trailing slash both yield clean keys.
fn strip_path_prefix<'a>(full_name: &'a str, path_prefix: &str) -> Result<&'a str> {
    let remainder =
        full_name
            .strip_prefix(path_prefix)
            .ok_or_else(|| SettingsError::PrefixMismatch {
                name: full_name.to_string(),
                prefix: path_prefix.to_string(),
            })?;
    Ok(remainder.strip_prefix('/').unwrap_or(remainder))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(mapped: &MappedItem) -> Vec<&str> {
        mapped.entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn test_prefix_is_never_part_of_the_key() {
        let mapped = map_item("/app/prod/db/host", "/app/prod/", "h1", false).unwrap();
        assert_eq!(keys(&mapped), vec!["db/host"]);
        assert!(!mapped.entries[0].key.contains("/app/prod"));
    }

    #[test]
    fn test_prefix_without_trailing_slash_still_strips_separator() {
        let mapped = map_item("/app/prod/db/host", "/app/prod", "h1", false).unwrap();
        assert_eq!(keys(&mapped), vec!["db/host"]);
    }

    #[test]
    fn test_mismatched_prefix_is_an_error() {
        let err = map_item("/other/env/db/host", "/app/prod/", "h1", false).unwrap_err();
        assert!(matches!(err, SettingsError::PrefixMismatch { .. }));
    }

    #[test]
    fn test_json_object_flattens_per_field() {
        let mapped = map_item(
            "/app/prod/sectionX/ignored-subkey",
            "/app/prod/",
            r#"{"a": "1", "b": "2"}"#,
            true,
        )
        .unwrap();

        assert!(mapped.composite);
        assert_eq!(mapped.entries.len(), 2);
        let mut sorted = mapped.entries.clone();
        sorted.sort_by(|x, y| x.key.cmp(&y.key));
        assert_eq!(sorted[0].key, "sectionX/a");
        assert_eq!(sorted[0].value, "1");
        assert_eq!(sorted[1].key, "sectionX/b");
        assert_eq!(sorted[1].value, "2");
    }

    #[test]
    fn test_scalar_secret_passes_through() {
        let mapped = map_item(
            "/app/prod/sectionY/keyZ",
            "/app/prod/",
            "plain-string",
            true,
        )
        .unwrap();

        assert!(!mapped.composite);
        assert_eq!(mapped.entries.len(), 1);
        assert_eq!(mapped.entries[0].key, "sectionY/keyZ");
        assert_eq!(mapped.entries[0].value, "plain-string");
    }

    #[test]
    fn test_json_array_is_not_flattened() {
        let mapped = map_item("/app/prod/db/hosts", "/app/prod/", r#"["h1", "h2"]"#, true).unwrap();
        assert!(!mapped.composite);
        assert_eq!(mapped.entries[0].key, "db/hosts");
        assert_eq!(mapped.entries[0].value, r#"["h1", "h2"]"#);
    }

    #[test]
    fn test_json_scalar_keeps_raw_text() {
        // "5432" parses as a JSON number but is not an object; the stored
        // text must come through untouched.
        let mapped = map_item("/app/prod/db/port", "/app/prod/", "5432", true).unwrap();
        assert_eq!(mapped.entries[0].value, "5432");
        assert!(!mapped.composite);
    }

    #[test]
    fn test_non_string_fields_are_serialized_back() {
        let mapped = map_item(
            "/app/prod/db/creds",
            "/app/prod/",
            r#"{"port": 5432, "tls": true, "opts": {"a": 1}}"#,
            true,
        )
        .unwrap();

        let mut sorted = mapped.entries.clone();
        sorted.sort_by(|x, y| x.key.cmp(&y.key));
        assert_eq!(sorted[0].key, "db/opts");
        assert_eq!(sorted[0].value, r#"{"a":1}"#);
        assert_eq!(sorted[1].key, "db/port");
        assert_eq!(sorted[1].value, "5432");
        assert_eq!(sorted[2].key, "db/tls");
        assert_eq!(sorted[2].value, "true");
    }

    #[test]
    fn test_composite_drops_segments_beyond_the_section() {
        let mapped = map_item(
            "/app/prod/db/nested/deeper",
            "/app/prod/",
            r#"{"user": "admin"}"#,
            true,
        )
        .unwrap();

        // Only the first segment survives as the section.
        assert_eq!(keys(&mapped), vec!["db/user"]);
    }

    #[test]
    fn test_empty_json_object_yields_no_entries() {
        let mapped = map_item("/app/prod/db/creds", "/app/prod/", "{}", true).unwrap();
        assert!(mapped.composite);
        assert!(mapped.entries.is_empty());
    }

    #[test]
    fn test_parameter_store_never_attempts_flattening() {
        // Even a value that looks like a JSON object stays verbatim when the
        // store does not declare composite values.
        let mapped = map_item(
            "/app/prod/db/blob",
            "/app/prod/",
            r#"{"a": "1"}"#,
            false,
        )
        .unwrap();
        assert!(!mapped.composite);
        assert_eq!(mapped.entries[0].key, "db/blob");
        assert_eq!(mapped.entries[0].value, r#"{"a": "1"}"#);
    }

    #[test]
    fn test_composite_key_format() {
        assert_eq!(composite_key("db", "host"), "db/host");
    }
}
