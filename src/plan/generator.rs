//! First-time plan generation from a vision statement.

use thiserror::Error;

use crate::llm::{ChatClient, ChatRequest, LlmError};

use super::coerce::{coerce_object, ParseFailure};
use super::prompt;
use super::schema::PlanDraft;
use super::validate::{validate_plan, PlanValidateError};

/// Sampling temperature for plan generation and reconciliation calls.
pub const PLAN_TEMPERATURE: f32 = 0.2;

/// Errors from the generation pipeline. None of these leave a partial tree
/// behind; persistence only happens on `Ok`.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("response could not be parsed: {0}")]
    Parse(#[from] ParseFailure),

    #[error("response failed schema validation: {0}")]
    Validate(#[from] PlanValidateError),
}

/// Generate a validated plan draft from a vision statement.
///
/// Retrieved examples and teams are advisory context and may be empty. This
/// is a pure transform over one chat call: nothing is persisted here, and a
/// draft is only returned when the response conforms to the plan schema.
pub async fn generate(
    client: &dyn ChatClient,
    vision: &str,
    sample_projects: &[String],
    sample_teams: &[String],
) -> Result<PlanDraft, GenerateError> {
    let request = ChatRequest {
        system: prompt::generation_system_prompt(),
        user: prompt::generation_user_prompt(vision, sample_projects, sample_teams),
        temperature: PLAN_TEMPERATURE,
    };

    let response = client.chat(&request).await?;
    let obj = coerce_object(&response.text)?;
    let draft = validate_plan(&obj)?;

    tracing::debug!(
        title = %draft.title,
        outcomes = draft.outcomes.len(),
        tasks = draft.task_count(),
        "generated plan draft"
    );
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;

    const VALID: &str = r#"{"title": "Launch", "outcomes": [
        {"description": "o", "benefits": [
            {"description": "b", "deliverables": [
                {"description": "d", "tasks": [
                    {"name": "t", "responsible_team": "T", "duration": 5}
                ]}
            ]}
        ]}
    ]}"#;

    #[tokio::test]
    async fn returns_validated_draft() {
        let client = MockChatClient::with_default(VALID);
        let draft = generate(&client, "a vision", &[], &[]).await.unwrap();
        assert_eq!(draft.title, "Launch");
        assert_eq!(draft.task_count(), 1);
    }

    #[tokio::test]
    async fn accepts_fenced_response() {
        let client = MockChatClient::with_default(format!("```json\n{VALID}\n```"));
        let draft = generate(&client, "a vision", &[], &[]).await.unwrap();
        assert_eq!(draft.title, "Launch");
    }

    #[tokio::test]
    async fn surfaces_parse_failure() {
        let client = MockChatClient::with_default("sorry, I cannot do that");
        let err = generate(&client, "a vision", &[], &[]).await.unwrap_err();
        assert!(matches!(err, GenerateError::Parse(_)));
    }

    #[tokio::test]
    async fn surfaces_schema_failure() {
        let client = MockChatClient::with_default(r#"{"title": "x"}"#);
        let err = generate(&client, "a vision", &[], &[]).await.unwrap_err();
        assert!(matches!(err, GenerateError::Validate(_)));
    }

    #[tokio::test]
    async fn surfaces_service_failure() {
        let client = MockChatClient::failing();
        let err = generate(&client, "a vision", &[], &[]).await.unwrap_err();
        assert!(matches!(err, GenerateError::Llm(_)));
    }
}
