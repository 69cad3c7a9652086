//! Secret scrubbing for audit snapshots.

use serde_json::Value as JsonValue;

/// Value written in place of a secret field.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Field names that never reach the audit trail in the clear.
///
/// Matched case-insensitively against object keys at every nesting level.
/// Redaction is unconditional: an empty or null secret field is still
/// replaced, so records never reveal whether a secret was set.
pub const SECRET_FIELDS: &[&str] = &[
    "password",
    "password_hash",
    "api_secret",
    "webhook_secret",
    "api_key",
    "token",
];

/// Replace every secret field in the snapshot with [`REDACTION_MARKER`].
pub fn redact_secrets(snapshot: &mut JsonValue) {
    match snapshot {
        JsonValue::Object(map) => {
            for (key, value) in map.iter_mut() {
                if is_secret(key) {
                    *value = JsonValue::String(REDACTION_MARKER.to_string());
                } else {
                    redact_secrets(value);
                }
            }
        }
        JsonValue::Array(items) => {
            for item in items.iter_mut() {
                redact_secrets(item);
            }
        }
        _ => {}
    }
}

fn is_secret(key: &str) -> bool {
    SECRET_FIELDS.iter().any(|f| key.eq_ignore_ascii_case(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_every_listed_field() {
        let mut snap = json!({
            "email": "ops@example.com",
            "password": "hunter22",
            "api_secret": "s3cr3t",
            "webhook_secret": "wh",
            "api_key": "key",
            "token": "tok",
        });
        redact_secrets(&mut snap);

        assert_eq!(snap["email"], json!("ops@example.com"));
        for field in ["password", "api_secret", "webhook_secret", "api_key", "token"] {
            assert_eq!(snap[field], json!(REDACTION_MARKER), "field {field}");
        }
    }

    #[test]
    fn redacts_even_empty_and_null_values() {
        let mut snap = json!({"password": "", "token": null});
        redact_secrets(&mut snap);
        assert_eq!(snap["password"], json!(REDACTION_MARKER));
        assert_eq!(snap["token"], json!(REDACTION_MARKER));
    }

    #[test]
    fn walks_nested_objects_and_arrays() {
        let mut snap = json!({
            "organisation": {"api_key": "abc", "name": "Acme"},
            "users": [{"password_hash": "phc", "email": "a@b.c"}],
        });
        redact_secrets(&mut snap);
        assert_eq!(snap["organisation"]["api_key"], json!(REDACTION_MARKER));
        assert_eq!(snap["organisation"]["name"], json!("Acme"));
        assert_eq!(snap["users"][0]["password_hash"], json!(REDACTION_MARKER));
        assert_eq!(snap["users"][0]["email"], json!("a@b.c"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let mut snap = json!({"Password": "x", "API_KEY": "y"});
        redact_secrets(&mut snap);
        assert_eq!(snap["Password"], json!(REDACTION_MARKER));
        assert_eq!(snap["API_KEY"], json!(REDACTION_MARKER));
    }
}
