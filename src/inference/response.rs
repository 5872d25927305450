//! Response body normalization.
//!
//! Inference endpoints answer with one of three shapes:
//!
//! | Shape | Example |
//! |-------|---------|
//! | string | `"Hello"` |
//! | list | `[{"generated_text": "Hello"}]` |
//! | object | `{"generated_text": "Hello"}` |

use serde::Deserialize;

#[derive(Deserialize)]
struct Generated {
    #[serde(default)]
    generated_text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenerationBody {
    Text(String),
    Batch(Vec<Generated>),
    Single(Generated),
}

/// Normalize a decoded response body to plain text.
///
/// A recognized shape without `generated_text` yields an empty string;
/// an unrecognized shape (numbers, empty lists, nested arrays) yields `None`.
pub fn normalize_body(body: serde_json::Value) -> Option<String> {
    match serde_json::from_value::<GenerationBody>(body).ok()? {
        GenerationBody::Text(text) => Some(text),
        GenerationBody::Batch(items) => items
            .into_iter()
            .next()
            .map(|first| first.generated_text.unwrap_or_default()),
        GenerationBody::Single(item) => Some(item.generated_text.unwrap_or_default()),
    }
}

/// Extract the `error` message and optional `estimated_time` from an error body.
pub(crate) fn error_details(body: &str) -> (Option<String>, Option<f64>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return (None, None);
    };
    let message = match &value["error"] {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    };
    (message, value["estimated_time"].as_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_body() {
        assert_eq!(normalize_body(json!("Hello")), Some("Hello".into()));
    }

    #[test]
    fn list_body_takes_first_element() {
        let body = json!([{"generated_text": "first"}, {"generated_text": "second"}]);
        assert_eq!(normalize_body(body), Some("first".into()));
    }

    #[test]
    fn object_body() {
        let body = json!({"generated_text": "<|assistant|>\nHello\n"});
        assert_eq!(normalize_body(body), Some("<|assistant|>\nHello\n".into()));
    }

    #[test]
    fn object_without_text_is_empty() {
        assert_eq!(normalize_body(json!({"other": 1})), Some(String::new()));
    }

    #[test]
    fn unrecognized_shapes_are_none() {
        assert_eq!(normalize_body(json!(42)), None);
        assert_eq!(normalize_body(json!([])), None);
        assert_eq!(normalize_body(json!(null)), None);
        assert_eq!(normalize_body(json!([[{"generated_text": "x"}]])), None);
    }

    #[test]
    fn error_details_reads_loading_payload() {
        let (message, estimate) = error_details(
            r#"{"error":"Model microsoft/Phi-3 is currently loading","estimated_time":20.5}"#,
        );
        assert_eq!(
            message.as_deref(),
            Some("Model microsoft/Phi-3 is currently loading")
        );
        assert_eq!(estimate, Some(20.5));
    }

    #[test]
    fn error_details_joins_error_lists() {
        let (message, _) = error_details(r#"{"error":["a","b"]}"#);
        assert_eq!(message.as_deref(), Some("a; b"));
    }

    #[test]
    fn error_details_tolerates_non_json() {
        assert_eq!(error_details("Service Unavailable"), (None, None));
    }
}
