use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retrieval service errors.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("retrieval service error ({status}): {body}")]
    Server { status: StatusCode, body: String },
}

/// One query result set from the vector store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedDocuments {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub metadatas: Vec<serde_json::Value>,
}

/// One document to upsert during the load step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDocument {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    text: &'a str,
    top_k: usize,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    documents: Vec<&'a str>,
    metadatas: Vec<serde_json::Value>,
}

/// HTTP client for the vector-store retrieval API.
#[derive(Debug, Clone)]
pub struct RetrievalClient {
    base_url: String,
    client: Client,
}

impl RetrievalClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    /// Query a collection for the documents most similar to `text`.
    pub async fn query(
        &self,
        collection: &str,
        text: &str,
        top_k: usize,
    ) -> Result<RetrievedDocuments, RetrievalError> {
        let url = format!("{}/collections/{}/query", self.base_url, collection);
        let response = self
            .client
            .post(&url)
            .json(&QueryRequest { text, top_k })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => RetrievalError::CollectionNotFound(collection.to_string()),
                _ => RetrievalError::Server { status, body },
            });
        }
        Ok(response.json().await?)
    }

    /// Query, degrading to an empty result on any failure.
    ///
    /// Retrieval is advisory context; generation must not fail because the
    /// index is unreachable.
    pub async fn query_or_empty(&self, collection: &str, text: &str, top_k: usize) -> Vec<String> {
        match self.query(collection, text, top_k).await {
            Ok(result) => result.documents,
            Err(e) => {
                tracing::warn!(collection, error = %e, "retrieval query failed; continuing without context");
                Vec::new()
            }
        }
    }

    /// Upsert documents into a collection, keyed by id. Safe to run
    /// repeatedly; the load step is idempotent.
    pub async fn upsert(
        &self,
        collection: &str,
        docs: &[SeedDocument],
    ) -> Result<usize, RetrievalError> {
        if docs.is_empty() {
            return Ok(0);
        }
        let url = format!("{}/collections/{}/upsert", self.base_url, collection);
        let body = UpsertRequest {
            ids: docs.iter().map(|d| d.id.as_str()).collect(),
            documents: docs.iter().map(|d| d.document.as_str()).collect(),
            metadatas: docs
                .iter()
                .map(|d| d.metadata.clone().unwrap_or(serde_json::Value::Null))
                .collect(),
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Server { status, body });
        }
        Ok(docs.len())
    }
}
