use crate::models::JsonObject;

/// PostgreSQL truncates identifiers longer than this many bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Turn an arbitrary JSON key or resource name into a snake_case identifier.
///
/// `lastOnline` → `last_online`, `@id` → `_id`, `2fa` → `_2fa`.
pub fn normalize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;

    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
        prev = Some(c);
    }

    if out.is_empty() {
        out.push('_');
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    // ASCII only at this point, so byte truncation is char-safe.
    out.truncate(MAX_IDENTIFIER_LEN);
    out
}

/// Normalize the top-level keys of a row. Nested values are left as-is.
///
/// When two keys collide after normalization the later one wins.
pub fn normalize_row(row: JsonObject) -> JsonObject {
    let mut out = JsonObject::with_capacity(row.len());
    for (key, value) in row {
        let column = normalize_identifier(&key);
        if out.insert(column.clone(), value).is_some() {
            tracing::debug!(%key, %column, "Column name collision after normalization");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("player_id"), "player_id");
        assert_eq!(normalize_identifier("lastOnline"), "last_online");
        assert_eq!(normalize_identifier("@id"), "_id");
        assert_eq!(normalize_identifier("is-online"), "is_online");
        assert_eq!(normalize_identifier("2fa"), "_2fa");
        assert_eq!(normalize_identifier("HTTPStatus"), "httpstatus");
        assert_eq!(normalize_identifier("rating2Value"), "rating2_value");
        assert_eq!(normalize_identifier(""), "_");
        assert_eq!(normalize_identifier("élo"), "_lo");
    }

    #[test]
    fn test_normalize_identifier_truncates() {
        let long = "a".repeat(100);
        assert_eq!(normalize_identifier(&long).len(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn test_normalize_row_keeps_nested_keys() {
        let row = json!({
            "@id": "https://api.chess.com/pub/player/hikaru",
            "white": {"@id": "nested", "userName": "x"},
        });
        let serde_json::Value::Object(row) = row else {
            unreachable!()
        };

        let normalized = normalize_row(row);
        assert_eq!(
            serde_json::Value::Object(normalized),
            json!({
                "_id": "https://api.chess.com/pub/player/hikaru",
                "white": {"@id": "nested", "userName": "x"},
            })
        );
    }
}
