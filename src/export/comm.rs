//! Communications plan: generation, normalization, CSV rendering.

use serde_json::{Map, Value};

use crate::llm::{ChatClient, ChatRequest};
use crate::plan::coerce_object;

use crate::csvio;

/// Canonical stakeholder columns, in render order.
const STAKEHOLDER_COLUMNS: &[&str] = &[
    "Name",
    "Role",
    "CommunicationMethod",
    "Frequency",
    "Responsible",
    "Priority",
    "PreferredDeliveryMethod",
    "CommunicationGoal",
];

/// A normalized communications plan ready for rendering.
#[derive(Debug, Clone)]
pub struct CommPlan {
    pub objective: String,
    /// Rows keyed by [`STAKEHOLDER_COLUMNS`].
    pub stakeholders: Vec<Vec<String>>,
    pub channels: Vec<String>,
    pub notes: String,
}

/// Ask the generation service for a communications plan object.
///
/// Returns the coerced object or None on any service/parse failure; the
/// caller normalizes either way, so a failed call degrades to the default
/// plan instead of failing the download.
pub async fn generate_comm_plan(client: &dyn ChatClient, desc: &str) -> Option<Map<String, Value>> {
    let system = format!(
        "You are a senior project communications consultant. Create a \
         Communication Plan JSON for the project described below.\n<desc>{desc}</desc>\n\n\
         Return ONLY a JSON object with this exact structure:\n\
         {{\n \"Objective\": \"...\",\n \"Stakeholders\": [\n   \
         {{\"Name\": \"...\", \"Role\": \"...\", \"CommunicationMethod\": \"Status Email / Standup / SteerCo / Board Pack\",\n    \
         \"Frequency\": \"Weekly / Fortnightly / Monthly / Ad-hoc\", \"Responsible\": \"...\", \"Priority\": \"High/Medium/Low\",\n    \
         \"PreferredDeliveryMethod\": \"Email / MS Teams / Slack / Portal\", \"CommunicationGoal\": \"...\"}}\n ],\n \
         \"Channels\": [\"Email\", \"MS Teams\", \"Standup\", \"SteerCo\"],\n \"Notes\": \"Short notes if any\"\n}}\n\
         Rules: Generate 8-12 relevant stakeholder rows. Tailor Roles & Frequency to the project description in <desc>."
    );
    let request = ChatRequest {
        system,
        user: "Generate the communication plan now.".to_string(),
        temperature: 0.3,
    };

    let response = match client.chat(&request).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "communications plan generation failed; using defaults");
            return None;
        }
    };
    match coerce_object(&response.text) {
        Ok(obj) => Some(obj),
        Err(e) => {
            tracing::warn!(error = %e, "communications plan response unusable; using defaults");
            None
        }
    }
}

/// Normalize whatever came back into a [`CommPlan`], falling back to the
/// default plan when stakeholder rows are missing or unusable.
pub fn normalize_comm_plan(raw: Option<Map<String, Value>>, project_name: &str) -> CommPlan {
    let Some(obj) = raw else {
        return default_comm_plan(project_name);
    };

    let stakeholders: Vec<Vec<String>> = obj
        .get("Stakeholders")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(stakeholder_row)
                .collect()
        })
        .unwrap_or_default();

    if stakeholders.is_empty() {
        return default_comm_plan(project_name);
    }

    let objective = obj
        .get("Objective")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("Communicate status, risks and decisions for {project_name}.")
        });

    let channels = obj
        .get("Channels")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| {
            vec![
                "Email".to_string(),
                "MS Teams".to_string(),
                "Standup".to_string(),
            ]
        });

    let notes = obj
        .get("Notes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    CommPlan {
        objective,
        stakeholders,
        channels,
        notes,
    }
}

fn stakeholder_row(obj: &Map<String, Value>) -> Vec<String> {
    let get = |key: &str| -> String {
        obj.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let or = |value: String, default: &str| -> String {
        if value.is_empty() {
            default.to_string()
        } else {
            value
        }
    };

    let name = {
        let n = get("Name");
        if n.is_empty() {
            get("Stakeholder")
        } else {
            n
        }
    };
    let goal = {
        let g = get("CommunicationGoal");
        if g.is_empty() {
            get("Purpose")
        } else {
            g
        }
    };

    vec![
        name,
        get("Role"),
        or(get("CommunicationMethod"), "Status Email"),
        or(get("Frequency"), "Weekly"),
        or(get("Responsible"), "Project Manager"),
        priority_norm(&get("Priority")),
        or(get("PreferredDeliveryMethod"), "Email"),
        goal,
    ]
}

/// Normalize a priority label to High/Medium/Low.
pub fn priority_norm(v: &str) -> String {
    let v = v.trim().to_lowercase();
    if v.starts_with('h') {
        "High".to_string()
    } else if v.starts_with('l') {
        "Low".to_string()
    } else {
        "Medium".to_string()
    }
}

/// The hand-authored plan used when generation is unavailable.
fn default_comm_plan(project_name: &str) -> CommPlan {
    let row = |name: &str, role: &str, method: &str, freq: &str, resp: &str, prio: &str,
               delivery: &str, goal: &str| {
        vec![
            name.to_string(),
            role.to_string(),
            method.to_string(),
            freq.to_string(),
            resp.to_string(),
            prio.to_string(),
            delivery.to_string(),
            goal.to_string(),
        ]
    };
    CommPlan {
        objective: format!(
            "Keep stakeholders for the '{project_name}' project aligned on schedule, risks, and go-live readiness."
        ),
        stakeholders: vec![
            row("Project Manager", "Delivery Lead", "Daily Standup", "Daily", "Self", "High", "MS Teams", "Coordinate delivery & unblock issues"),
            row("Executive Sponsor", "Sponsor", "Steering Committee", "Fortnightly", "Project Manager", "High", "Board Pack / Email", "Secure decisions, manage risks"),
            row("Product Team", "Product", "Backlog Review", "Weekly", "Product Manager", "High", "Jira / Teams", "Align on scope and priorities"),
            row("Tech Lead", "Technology", "Tech Sync", "Weekly", "Tech Lead", "Medium", "Teams", "Resolve architectural issues"),
        ],
        channels: vec![
            "Email".to_string(),
            "MS Teams".to_string(),
            "Standup".to_string(),
            "Steering Committee".to_string(),
        ],
        notes: "This is a default plan. The AI-generated plan could not be created.".to_string(),
    }
}

/// Render the communications plan as a CSV document.
pub fn comm_plan_csv(plan: &CommPlan, project_name: &str) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    rows.push(vec![format!("Communication Plan - {project_name}")]);
    rows.push(vec![]);
    rows.push(vec!["Summary".to_string()]);
    rows.push(vec![plan.objective.clone()]);
    rows.push(vec![]);
    rows.push(vec!["Stakeholders".to_string()]);
    rows.push(STAKEHOLDER_COLUMNS.iter().map(|s| s.to_string()).collect());
    rows.extend(plan.stakeholders.iter().cloned());
    rows.push(vec![]);
    rows.push(vec!["Channels".to_string()]);
    for ch in &plan.channels {
        rows.push(vec![ch.clone()]);
    }
    if !plan.notes.is_empty() {
        rows.push(vec![]);
        rows.push(vec!["Notes".to_string(), plan.notes.clone()]);
    }
    csvio::render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_priority_labels() {
        assert_eq!(priority_norm("high"), "High");
        assert_eq!(priority_norm("HIGH priority"), "High");
        assert_eq!(priority_norm("low"), "Low");
        assert_eq!(priority_norm("whatever"), "Medium");
        assert_eq!(priority_norm(""), "Medium");
    }

    #[test]
    fn missing_stakeholders_falls_back_to_default() {
        let obj = json!({"Objective": "x", "Stakeholders": []});
        let plan = normalize_comm_plan(obj.as_object().cloned(), "Demo");
        assert_eq!(plan.stakeholders.len(), 4);
        assert!(plan.notes.contains("default plan"));
    }

    #[test]
    fn fills_stakeholder_defaults_and_aliases() {
        let obj = json!({
            "Objective": "Keep everyone aligned",
            "Stakeholders": [
                {"Stakeholder": "CFO", "Priority": "h", "Purpose": "Budget sign-off"}
            ],
            "Channels": ["Email"]
        });
        let plan = normalize_comm_plan(obj.as_object().cloned(), "Demo");
        let row = &plan.stakeholders[0];
        assert_eq!(row[0], "CFO");
        assert_eq!(row[2], "Status Email");
        assert_eq!(row[5], "High");
        assert_eq!(row[7], "Budget sign-off");
    }

    #[test]
    fn renders_csv_sections() {
        let plan = normalize_comm_plan(None, "Demo");
        let csv = comm_plan_csv(&plan, "Demo");
        assert!(csv.starts_with("Communication Plan - Demo\n"));
        assert!(csv.contains("Stakeholders\n"));
        assert!(csv.contains("Channels\n"));
        assert!(csv.contains("Project Manager"));
    }
}
