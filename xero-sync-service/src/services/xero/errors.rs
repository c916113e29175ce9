//! Translation of Xero error payloads.

use crate::error::XeroError;
use serde_json::Value;

/// Every validation message across every element, in document order.
/// Elements or entries of an unexpected shape are skipped individually.
pub(crate) fn validation_messages(elements: &Value) -> Vec<String> {
    let Some(elements) = elements.as_array() else {
        return Vec::new();
    };

    elements
        .iter()
        .filter_map(|element| element.get("ValidationErrors").and_then(Value::as_array))
        .flatten()
        .filter_map(|error| error.get("Message").and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace an HTTP failure carrying a validation payload with a single
/// `ValidationFailed` that concatenates all of its messages.
pub(crate) fn translate(err: XeroError) -> XeroError {
    let XeroError::Http { body, .. } = &err else {
        return err;
    };

    let messages = serde_json::from_str::<Value>(body)
        .map(|parsed| validation_messages(&parsed["Elements"]))
        .unwrap_or_default();

    if messages.is_empty() {
        return err;
    }

    let translated = XeroError::ValidationFailed(messages.join("; "));
    tracing::error!(error = %translated, "Xero rejected the request");
    translated
}
