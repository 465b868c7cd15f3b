//! Validation of retrieved sample projects before prompt inclusion.

use crate::plan::{coerce_object, validate_plan};

/// Validate a retrieved sample project document and serialize it into a clean
/// JSON string for prompt inclusion.
///
/// Stored samples are not trusted to match the plan schema. A sample that
/// validates is re-serialized from the validated draft; one that parses but
/// fails validation falls back to a compact re-serialization of whatever it
/// is; anything else is passed through trimmed. Retrieval context is
/// advisory, so this never fails.
pub fn validate_and_serialize_sample(document: &str) -> String {
    match coerce_object(document) {
        Ok(obj) => match validate_plan(&obj) {
            Ok(draft) => {
                serde_json::to_string(&draft).unwrap_or_else(|_| document.trim().to_string())
            }
            Err(e) => {
                tracing::debug!(error = %e, "sample project failed schema validation; using raw serialization");
                serde_json::to_string(&obj).unwrap_or_else(|_| document.trim().to_string())
            }
        },
        Err(_) => document.trim().to_string(),
    }
}

/// Validate and serialize every retrieved sample in order.
pub fn validate_and_serialize_samples(documents: &[String]) -> Vec<String> {
    documents
        .iter()
        .map(|d| validate_and_serialize_sample(d))
        .collect()
}
