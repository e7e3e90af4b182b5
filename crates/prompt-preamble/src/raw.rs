//! Injection over untyped JSON request bodies.
//!
//! Request-handling layers often carry the body as a `serde_json::Value`
//! rather than a [`ChatRequest`](crate::ChatRequest). Messages there are not
//! guaranteed to have a `role` or `content`, so the whole list is checked
//! before anything changes: a body either comes back fully injected or
//! untouched alongside an [`InjectError`].

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::error::InjectError;
use crate::preamble::IdentityInjector;

const SYSTEM_ROLE: &str = "system";

/// Inject into `body` in place.
///
/// Accepts either a bare array of messages or an object whose `messages`
/// key holds one. An object with no `messages` (or `null`) is treated as an
/// empty conversation and gets a `messages` array holding the new system
/// message. Unknown roles and extra keys pass through untouched.
///
/// Every message is checked for an object shape and a string `role`, including
/// those after the first system message; only the first system message's
/// `content` is type-checked. Any failure leaves `body` as it was.
pub fn apply_to_value(body: &mut Value, injector: &IdentityInjector) -> Result<(), InjectError> {
    let list = match body {
        Value::Array(list) => list,
        Value::Object(obj) => {
            let slot = obj
                .entry("messages")
                .or_insert_with(|| Value::Array(Vec::new()));
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            match slot {
                Value::Array(list) => list,
                _ => {
                    warn!("Rejecting request body: `messages` is not an array");
                    return Err(InjectError::NotAMessageList);
                }
            }
        }
        _ => {
            warn!("Rejecting request body: not an array or object");
            return Err(InjectError::NotAMessageList);
        }
    };

    let first_system = validate(list).inspect_err(|e| {
        warn!("Rejecting request body: {e}");
    })?;

    match first_system {
        Some((idx, content)) => {
            let updated = injector.ensure_prefix(content.as_deref());
            // `validate` confirmed `idx` is in bounds and holds an object.
            list[idx]["content"] = Value::String(updated);
        }
        None => {
            list.insert(0, json!({"role": SYSTEM_ROLE, "content": injector.trimmed()}));
        }
    }
    Ok(())
}

/// Parse `body`, inject with the default instruction, and serialize it back.
pub fn apply_to_json(body: &str) -> Result<String, InjectError> {
    let mut value: Value = serde_json::from_str(body)?;
    apply_to_value(&mut value, &IdentityInjector::default())?;
    Ok(serde_json::to_string(&value)?)
}

/// Check every message's shape and locate the first system message, returning
/// its index and current content (absent and `null` both map to `None`).
fn validate(list: &[Value]) -> Result<Option<(usize, Option<String>)>, InjectError> {
    let mut first_system = None;
    for (index, msg) in list.iter().enumerate() {
        let obj = msg.as_object().ok_or(InjectError::WrongType {
            index,
            field: "message",
            expected: "an object",
        })?;
        let role = role_of(obj, index)?;
        if first_system.is_none() && role == SYSTEM_ROLE {
            first_system = Some((index, content_of(obj, index)?));
        }
    }
    Ok(first_system)
}

fn role_of(obj: &Map<String, Value>, index: usize) -> Result<&str, InjectError> {
    match obj.get("role") {
        None => Err(InjectError::MissingField {
            index,
            field: "role",
        }),
        Some(Value::String(role)) => Ok(role.as_str()),
        Some(_) => Err(InjectError::WrongType {
            index,
            field: "role",
            expected: "a string",
        }),
    }
}

fn content_of(obj: &Map<String, Value>, index: usize) -> Result<Option<String>, InjectError> {
    match obj.get("content") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(content)) => Ok(Some(content.clone())),
        Some(_) => Err(InjectError::WrongType {
            index,
            field: "content",
            expected: "a string or null",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IDENTITY_INSTRUCTION;

    fn apply(body: &mut Value) -> Result<(), InjectError> {
        apply_to_value(body, &IdentityInjector::default())
    }

    #[test]
    fn bare_array_gets_system_message() {
        let mut body = json!([{"role": "user", "content": "hi"}]);
        apply(&mut body).unwrap();
        assert_eq!(
            body,
            json!([
                {"role": "system", "content": IDENTITY_INSTRUCTION.trim()},
                {"role": "user", "content": "hi"}
            ])
        );
    }

    #[test]
    fn object_body_is_processed_on_messages_key() {
        let mut body = json!({
            "model": "m",
            "stream": true,
            "messages": [{"role": "system", "content": "Be nice.", "name": "ops"}]
        });
        apply(&mut body).unwrap();
        assert_eq!(body["model"], "m");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["name"], "ops");
        assert_eq!(
            body["messages"][0]["content"],
            format!("{IDENTITY_INSTRUCTION}Be nice.")
        );
    }

    #[test]
    fn object_without_messages_gets_one() {
        let mut body = json!({"model": "m"});
        apply(&mut body).unwrap();
        assert_eq!(
            body["messages"],
            json!([{"role": "system", "content": IDENTITY_INSTRUCTION.trim()}])
        );

        let mut body = json!({"messages": null});
        apply(&mut body).unwrap();
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn null_content_counts_as_empty() {
        let mut body = json!([{"role": "system", "content": null}]);
        apply(&mut body).unwrap();
        assert_eq!(body[0]["content"], IDENTITY_INSTRUCTION.trim());

        let mut body = json!([{"role": "system"}]);
        apply(&mut body).unwrap();
        assert_eq!(body[0]["content"], IDENTITY_INSTRUCTION.trim());
    }

    #[test]
    fn unknown_roles_pass_through() {
        let mut body = json!([{"role": "developer", "content": "x"}]);
        apply(&mut body).unwrap();
        assert_eq!(body[0]["role"], "system");
        assert_eq!(body[1], json!({"role": "developer", "content": "x"}));
    }

    #[test]
    fn missing_role_is_rejected_and_body_untouched() {
        let original = json!([{"role": "system", "content": "a"}, {"content": "hi"}]);
        let mut body = original.clone();
        let err = apply(&mut body).unwrap_err();
        assert!(matches!(
            err,
            InjectError::MissingField {
                index: 1,
                field: "role"
            }
        ));
        assert_eq!(body, original);
    }

    #[test]
    fn non_string_role_is_rejected() {
        let mut body = json!([{"role": 3, "content": "hi"}]);
        let err = apply(&mut body).unwrap_err();
        assert!(matches!(
            err,
            InjectError::WrongType {
                index: 0,
                field: "role",
                ..
            }
        ));
    }

    #[test]
    fn non_string_system_content_is_rejected() {
        let original = json!([{"role": "system", "content": [{"type": "text"}]}]);
        let mut body = original.clone();
        let err = apply(&mut body).unwrap_err();
        assert!(matches!(
            err,
            InjectError::WrongType {
                index: 0,
                field: "content",
                ..
            }
        ));
        assert_eq!(body, original);
    }

    #[test]
    fn malformed_message_after_system_is_rejected() {
        let original = json!([
            {"role": "system", "content": "first"},
            {"role": "user", "content": "hi"},
            {"content": "no role"}
        ]);
        let mut body = original.clone();
        let err = apply(&mut body).unwrap_err();
        assert!(matches!(
            err,
            InjectError::MissingField {
                index: 2,
                field: "role"
            }
        ));
        assert_eq!(body, original);
    }

    #[test]
    fn later_system_content_is_not_inspected() {
        let mut body = json!([
            {"role": "system", "content": "first"},
            {"role": "system", "content": 42}
        ]);
        apply(&mut body).unwrap();
        assert_eq!(body[1]["content"], 42);
    }

    #[test]
    fn non_object_message_is_rejected() {
        let mut body = json!(["hello"]);
        let err = apply(&mut body).unwrap_err();
        assert!(matches!(
            err,
            InjectError::WrongType {
                index: 0,
                field: "message",
                ..
            }
        ));
    }

    #[test]
    fn scalar_body_is_rejected() {
        assert!(matches!(
            apply(&mut json!("hi")).unwrap_err(),
            InjectError::NotAMessageList
        ));
        assert!(matches!(
            apply(&mut json!({"messages": "hi"})).unwrap_err(),
            InjectError::NotAMessageList
        ));
    }

    #[test]
    fn apply_to_json_round_trips_text() {
        let out = apply_to_json(r#"[{"role":"user","content":"hi"}]"#).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["role"], "system");
        assert_eq!(value[1]["content"], "hi");
    }

    #[test]
    fn apply_to_json_reports_parse_errors() {
        let err = apply_to_json("{not json").unwrap_err();
        assert!(matches!(err, InjectError::Json(_)));
        assert!(err.to_string().starts_with("json: "));
    }
}
