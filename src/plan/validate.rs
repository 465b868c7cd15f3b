//! Plan schema validation.
//!
//! One explicit validation step with one typed error, shared by the generator
//! and the reconciler. Validates a coerced JSON object against the plan
//! schema:
//! - `title` is a non-empty string
//! - `outcomes` / `benefits` / `deliverables` / `tasks` are lists
//! - every `description` / task `name` is a non-empty string
//! - task `duration` is an integer > 0
//! - `start_date` / `end_date` are optional `YYYY-MM-DD` strings, and
//!   `end_date` must not precede `start_date`

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::{BenefitDraft, DeliverableDraft, OutcomeDraft, PlanDraft, TaskDraft};

/// Errors from validating a coerced plan object against the schema.
#[derive(Debug, Error)]
pub enum PlanValidateError {
    #[error("missing required key at {path}")]
    MissingKey { path: String },

    #[error("wrong type at {path} (expected {expected})")]
    WrongType { path: String, expected: &'static str },

    #[error("empty text at {path}")]
    EmptyText { path: String },

    #[error("duration at {path} must be a positive integer, got {value}")]
    NonPositiveDuration { path: String, value: i64 },

    #[error("invalid date at {path}: {value:?} (expected YYYY-MM-DD)")]
    InvalidDate { path: String, value: String },

    #[error("end date precedes start date at {path}")]
    EndBeforeStart { path: String },
}

/// Validate a coerced JSON object into a [`PlanDraft`].
///
/// Returns the first violation found; a draft is only produced when the whole
/// document conforms, so callers can persist the result without re-checking.
pub fn validate_plan(obj: &Map<String, Value>) -> Result<PlanDraft, PlanValidateError> {
    let title = required_text(obj, "title", "title")?;

    let outcomes_raw = required_list(obj, "outcomes", "outcomes")?;
    let mut outcomes = Vec::with_capacity(outcomes_raw.len());
    for (i, item) in outcomes_raw.iter().enumerate() {
        outcomes.push(validate_outcome(item, &format!("outcomes[{i}]"))?);
    }

    Ok(PlanDraft { title, outcomes })
}

fn validate_outcome(v: &Value, path: &str) -> Result<OutcomeDraft, PlanValidateError> {
    let obj = as_object(v, path)?;
    let description = required_text(obj, "description", &format!("{path}.description"))?;

    let benefits_raw = required_list(obj, "benefits", &format!("{path}.benefits"))?;
    let mut benefits = Vec::with_capacity(benefits_raw.len());
    for (i, item) in benefits_raw.iter().enumerate() {
        benefits.push(validate_benefit(item, &format!("{path}.benefits[{i}]"))?);
    }

    Ok(OutcomeDraft {
        description,
        benefits,
    })
}

fn validate_benefit(v: &Value, path: &str) -> Result<BenefitDraft, PlanValidateError> {
    let obj = as_object(v, path)?;
    let description = required_text(obj, "description", &format!("{path}.description"))?;

    let deliverables_raw = required_list(obj, "deliverables", &format!("{path}.deliverables"))?;
    let mut deliverables = Vec::with_capacity(deliverables_raw.len());
    for (i, item) in deliverables_raw.iter().enumerate() {
        deliverables.push(validate_deliverable(
            item,
            &format!("{path}.deliverables[{i}]"),
        )?);
    }

    Ok(BenefitDraft {
        description,
        deliverables,
    })
}

fn validate_deliverable(v: &Value, path: &str) -> Result<DeliverableDraft, PlanValidateError> {
    let obj = as_object(v, path)?;
    let description = required_text(obj, "description", &format!("{path}.description"))?;

    let tasks_raw = required_list(obj, "tasks", &format!("{path}.tasks"))?;
    let mut tasks = Vec::with_capacity(tasks_raw.len());
    for (i, item) in tasks_raw.iter().enumerate() {
        tasks.push(validate_task(item, &format!("{path}.tasks[{i}]"))?);
    }

    Ok(DeliverableDraft {
        description,
        tasks,
    })
}

fn validate_task(v: &Value, path: &str) -> Result<TaskDraft, PlanValidateError> {
    let obj = as_object(v, path)?;
    let name = required_text(obj, "name", &format!("{path}.name"))?;

    // Generation services sometimes omit the team; treat that as unassigned
    // rather than rejecting the whole tree.
    let responsible_team = match obj.get("responsible_team") {
        None | Some(Value::Null) => "Unassigned".to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::String(_)) => "Unassigned".to_string(),
        Some(_) => {
            return Err(PlanValidateError::WrongType {
                path: format!("{path}.responsible_team"),
                expected: "string",
            })
        }
    };

    let duration = match obj.get("duration") {
        None => {
            return Err(PlanValidateError::MissingKey {
                path: format!("{path}.duration"),
            })
        }
        Some(v) => v.as_i64().ok_or_else(|| PlanValidateError::WrongType {
            path: format!("{path}.duration"),
            expected: "integer",
        })?,
    };
    if duration <= 0 {
        return Err(PlanValidateError::NonPositiveDuration {
            path: format!("{path}.duration"),
            value: duration,
        });
    }

    let start_date = optional_date(obj, "start_date", path)?;
    let end_date = optional_date(obj, "end_date", path)?;
    if let (Some(s), Some(e)) = (start_date, end_date) {
        if e < s {
            return Err(PlanValidateError::EndBeforeStart {
                path: path.to_string(),
            });
        }
    }

    Ok(TaskDraft {
        name,
        responsible_team,
        duration,
        start_date,
        end_date,
    })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn as_object<'a>(v: &'a Value, path: &str) -> Result<&'a Map<String, Value>, PlanValidateError> {
    v.as_object().ok_or(PlanValidateError::WrongType {
        path: path.to_string(),
        expected: "object",
    })
}

fn required_text(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<String, PlanValidateError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(PlanValidateError::MissingKey {
            path: path.to_string(),
        }),
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() {
                Err(PlanValidateError::EmptyText {
                    path: path.to_string(),
                })
            } else {
                Ok(t.to_string())
            }
        }
        Some(_) => Err(PlanValidateError::WrongType {
            path: path.to_string(),
            expected: "string",
        }),
    }
}

fn required_list<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a Vec<Value>, PlanValidateError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(PlanValidateError::MissingKey {
            path: path.to_string(),
        }),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(PlanValidateError::WrongType {
            path: path.to_string(),
            expected: "list",
        }),
    }
}

fn optional_date(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<NaiveDate>, PlanValidateError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| PlanValidateError::InvalidDate {
                path: format!("{path}.{key}"),
                value: s.clone(),
            }),
        Some(other) => Err(PlanValidateError::InvalidDate {
            path: format!("{path}.{key}"),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::coerce::coerce_object;

    fn valid_plan_json() -> &'static str {
        r#"{
            "title": "Warehouse Automation",
            "outcomes": [
                { "description": "Faster order fulfilment",
                  "benefits": [
                    { "description": "Lower cost per order",
                      "deliverables": [
                        { "description": "Conveyor control system",
                          "tasks": [
                            { "name": "Install conveyors",
                              "responsible_team": "Operations",
                              "duration": 14 },
                            { "name": "Commission software",
                              "responsible_team": "Engineering",
                              "duration": 7,
                              "start_date": "2025-03-01",
                              "end_date": "2025-03-08" }
                          ] }
                      ] }
                  ] }
            ]
        }"#
    }

    #[test]
    fn accepts_valid_plan() {
        let obj = coerce_object(valid_plan_json()).unwrap();
        let plan = validate_plan(&obj).expect("should validate");
        assert_eq!(plan.title, "Warehouse Automation");
        assert_eq!(plan.outcomes.len(), 1);
        assert_eq!(plan.task_count(), 2);
        let task = &plan.outcomes[0].benefits[0].deliverables[0].tasks[1];
        assert_eq!(task.start_date.unwrap().to_string(), "2025-03-01");
    }

    #[test]
    fn rejects_missing_title() {
        let obj = coerce_object(r#"{"outcomes": []}"#).unwrap();
        let err = validate_plan(&obj).unwrap_err();
        assert!(matches!(err, PlanValidateError::MissingKey { ref path } if path == "title"));
    }

    #[test]
    fn rejects_outcomes_of_wrong_type() {
        let obj = coerce_object(r#"{"title": "x", "outcomes": "not a list"}"#).unwrap();
        let err = validate_plan(&obj).unwrap_err();
        assert!(matches!(err, PlanValidateError::WrongType { expected: "list", .. }));
    }

    #[test]
    fn rejects_empty_description() {
        let obj = coerce_object(
            r#"{"title": "x", "outcomes": [{"description": "  ", "benefits": []}]}"#,
        )
        .unwrap();
        let err = validate_plan(&obj).unwrap_err();
        assert!(matches!(err, PlanValidateError::EmptyText { .. }));
    }

    #[test]
    fn rejects_zero_duration() {
        let obj = coerce_object(
            r#"{"title": "x", "outcomes": [{"description": "o", "benefits": [
                {"description": "b", "deliverables": [
                    {"description": "d", "tasks": [
                        {"name": "t", "responsible_team": "T", "duration": 0}
                    ]}
                ]}
            ]}]}"#,
        )
        .unwrap();
        let err = validate_plan(&obj).unwrap_err();
        assert!(matches!(
            err,
            PlanValidateError::NonPositiveDuration { value: 0, .. }
        ));
    }

    #[test]
    fn rejects_end_before_start() {
        let obj = coerce_object(
            r#"{"title": "x", "outcomes": [{"description": "o", "benefits": [
                {"description": "b", "deliverables": [
                    {"description": "d", "tasks": [
                        {"name": "t", "responsible_team": "T", "duration": 5,
                         "start_date": "2025-06-10", "end_date": "2025-06-01"}
                    ]}
                ]}
            ]}]}"#,
        )
        .unwrap();
        let err = validate_plan(&obj).unwrap_err();
        assert!(matches!(err, PlanValidateError::EndBeforeStart { .. }));
    }

    #[test]
    fn rejects_malformed_date() {
        let obj = coerce_object(
            r#"{"title": "x", "outcomes": [{"description": "o", "benefits": [
                {"description": "b", "deliverables": [
                    {"description": "d", "tasks": [
                        {"name": "t", "responsible_team": "T", "duration": 5,
                         "start_date": "June 10th"}
                    ]}
                ]}
            ]}]}"#,
        )
        .unwrap();
        let err = validate_plan(&obj).unwrap_err();
        assert!(matches!(err, PlanValidateError::InvalidDate { .. }));
    }

    #[test]
    fn defaults_missing_team_to_unassigned() {
        let obj = coerce_object(
            r#"{"title": "x", "outcomes": [{"description": "o", "benefits": [
                {"description": "b", "deliverables": [
                    {"description": "d", "tasks": [
                        {"name": "t", "duration": 3}
                    ]}
                ]}
            ]}]}"#,
        )
        .unwrap();
        let plan = validate_plan(&obj).unwrap();
        assert_eq!(
            plan.outcomes[0].benefits[0].deliverables[0].tasks[0].responsible_team,
            "Unassigned"
        );
    }

    #[test]
    fn accepts_empty_outcome_list() {
        let obj = coerce_object(r#"{"title": "x", "outcomes": []}"#).unwrap();
        let plan = validate_plan(&obj).unwrap();
        assert!(plan.outcomes.is_empty());
    }
}
