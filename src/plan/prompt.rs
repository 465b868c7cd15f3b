//! Prompt construction for plan generation and reconciliation.
//!
//! Pure string assembly; no I/O. Both prompts pin the service to the same
//! strict JSON schema so one validation step covers both paths.

use crate::models::PlanEdit;

use super::schema::PlanDraft;

/// JSON schema reference included in every system prompt.
const SCHEMA_REFERENCE: &str = r#"Return ONLY a JSON object with exactly this structure (no prose, no code fences):

{
  "title": "concise project name",
  "outcomes": [
    { "description": "desired final result",
      "benefits": [
        { "description": "value realized from the outcome",
          "deliverables": [
            { "description": "tangible output",
              "tasks": [
                { "name": "specific action",
                  "responsible_team": "team label",
                  "duration": 14 }
              ] }
          ] }
      ] }
  ]
}

Rules:
- "duration" is a positive integer number of days.
- Tasks may optionally carry "start_date" and "end_date" as "YYYY-MM-DD".
- Every list must be present, even if empty.
- Do not add keys beyond the schema."#;

/// Build the system instruction for first-time generation.
pub fn generation_system_prompt() -> String {
    format!(
        "You are a project management assistant. Generate a complete project \
         plan from the user's vision statement, cascading top-down: vision \u{2192} \
         outcomes \u{2192} benefits \u{2192} deliverables \u{2192} tasks.\n\n{SCHEMA_REFERENCE}"
    )
}

/// Build the user content for first-time generation: the vision plus any
/// retrieved advisory context.
pub fn generation_user_prompt(
    vision: &str,
    sample_projects: &[String],
    sample_teams: &[String],
) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(&format!("Vision: {vision}\n"));

    if !sample_projects.is_empty() {
        prompt.push_str("\nSimilar past projects you can use as examples:\n");
        for s in sample_projects {
            prompt.push_str(&format!("- {s}\n"));
        }
    }
    if !sample_teams.is_empty() {
        prompt.push_str("\nOrganizational teams available for assignment:\n");
        for t in sample_teams {
            prompt.push_str(&format!("- {t}\n"));
        }
    }
    prompt
}

/// Build the system instruction for reconciliation after a single-field edit.
pub fn reconcile_system_prompt() -> String {
    format!(
        "You are a project management assistant. The user edited one field of \
         an existing project plan. Regenerate the COMPLETE plan so the whole \
         tree stays logically consistent with the edit. You may add, remove, \
         or rewrite any node at any level -- not just the edited one -- to \
         preserve top-down coherence (vision \u{2192} outcomes \u{2192} benefits \u{2192} \
         deliverables \u{2192} tasks).\n\n{SCHEMA_REFERENCE}"
    )
}

/// Build the user content for reconciliation: the edit, the full current
/// tree, and any retrieved advisory context.
pub fn reconcile_user_prompt(
    vision: &str,
    edit: &PlanEdit,
    current: &PlanDraft,
    sample_projects: &[String],
    sample_teams: &[String],
) -> String {
    let current_json =
        serde_json::to_string_pretty(current).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = String::with_capacity(2048);
    prompt.push_str(&format!("Vision: {vision}\n"));
    prompt.push_str(&format!("Edited field: {}\n", edit.field_name()));
    prompt.push_str(&format!("New value: {}\n", edit.new_value()));
    prompt.push_str(&format!("\nCurrent plan (after the edit):\n{current_json}\n"));

    if !sample_projects.is_empty() {
        prompt.push_str("\nSimilar past projects you can use as examples:\n");
        for s in sample_projects {
            prompt.push_str(&format!("- {s}\n"));
        }
    }
    if !sample_teams.is_empty() {
        prompt.push_str("\nOrganizational teams available for assignment:\n");
        for t in sample_teams {
            prompt.push_str(&format!("- {t}\n"));
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::schema::{OutcomeDraft, PlanDraft};

    fn sample_draft() -> PlanDraft {
        PlanDraft {
            title: "Retail App".to_string(),
            outcomes: vec![OutcomeDraft {
                description: "Higher conversion".to_string(),
                benefits: vec![],
            }],
        }
    }

    #[test]
    fn generation_prompt_contains_schema_markers() {
        let prompt = generation_system_prompt();
        assert!(prompt.contains("\"title\""));
        assert!(prompt.contains("\"outcomes\""));
        assert!(prompt.contains("\"responsible_team\""));
        assert!(prompt.contains("positive integer number of days"));
    }

    #[test]
    fn generation_user_prompt_includes_context() {
        let prompt = generation_user_prompt(
            "Automate the launch process",
            &["Sample project A".to_string()],
            &["Platform Team".to_string()],
        );
        assert!(prompt.contains("Vision: Automate the launch process"));
        assert!(prompt.contains("Sample project A"));
        assert!(prompt.contains("Platform Team"));
    }

    #[test]
    fn generation_user_prompt_omits_empty_sections() {
        let prompt = generation_user_prompt("v", &[], &[]);
        assert!(!prompt.contains("Similar past projects"));
        assert!(!prompt.contains("Organizational teams"));
    }

    #[test]
    fn reconcile_prompt_names_edit_and_embeds_tree() {
        let edit = crate::models::PlanEdit::Vision {
            vision: "Go nationwide".to_string(),
        };
        let prompt = reconcile_user_prompt("Go nationwide", &edit, &sample_draft(), &[], &[]);
        assert!(prompt.contains("Edited field: vision"));
        assert!(prompt.contains("New value: Go nationwide"));
        assert!(prompt.contains("Higher conversion"));
    }

    #[test]
    fn reconcile_system_prompt_permits_whole_tree_rewrites() {
        let prompt = reconcile_system_prompt();
        assert!(prompt.contains("add, remove, or rewrite any node"));
    }
}
