use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The five required fields of an evaluated plan document.
pub const REQUIRED_FIELDS: [&str; 5] = ["Vision", "Outcomes", "Benefits", "Deliverables", "Tasks"];

/// A flat plan document as produced by evaluation prompts.
///
/// Each field may be a string, a list, or a nested structure; checks flatten
/// them with [`crate::eval::textify`] before comparing. Both `Vision` and
/// `vision` key casings are accepted on input; reports always emit the
/// capitalized form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(rename = "Vision", alias = "vision", default)]
    pub vision: Value,
    #[serde(rename = "Outcomes", alias = "outcomes", default)]
    pub outcomes: Value,
    #[serde(rename = "Benefits", alias = "benefits", default)]
    pub benefits: Value,
    #[serde(rename = "Deliverables", alias = "deliverables", default)]
    pub deliverables: Value,
    #[serde(rename = "Tasks", alias = "tasks", default)]
    pub tasks: Value,
}

static NULL: Value = Value::Null;

impl PlanDocument {
    /// Field accessor by canonical name.
    pub fn field(&self, name: &str) -> &Value {
        match name {
            "Vision" => &self.vision,
            "Outcomes" => &self.outcomes,
            "Benefits" => &self.benefits,
            "Deliverables" => &self.deliverables,
            "Tasks" => &self.tasks,
            _ => &NULL,
        }
    }

    /// A field is present when it is not null, not an empty string, and not
    /// an empty list.
    pub fn field_present(&self, name: &str) -> bool {
        match self.field(name) {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        }
    }
}
