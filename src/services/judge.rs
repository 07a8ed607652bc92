//! # Judge Client
//!
//! External collaborator that reduces a code submission to a single boolean
//! correctness verdict (`spec.md` §4.5, §1 — problem authoring and code
//! execution are out of scope for the core). The trait mirrors
//! [`crate::services::queue_store::QueueStore`]: a real HTTP implementation
//! for production, a deterministic fake for tests.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, instrument};

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge request failed: {0}")]
    RequestFailed(String),
}

/// A submission forwarded to the external judge.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub language: &'a str,
    pub source: &'a str,
    pub problem_id: i64,
}

/// Obtains a correctness verdict for a submission. The fetch is
/// side-effect-free from the core's perspective and may be long-running; it
/// must not be called while holding a match-level lock (`spec.md` §4.5).
#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn judge(&self, submission: Submission<'_>) -> Result<bool, JudgeError>;
}

/// Development/testing implementation that logs the submission and returns a
/// fixed verdict, the way [`crate::services::jwt`]'s callers are exercised
/// without a live auth collaborator.
pub struct LogJudgeClient {
    pub verdict: bool,
}

#[async_trait]
impl JudgeClient for LogJudgeClient {
    #[instrument(skip(self, submission))]
    async fn judge(&self, submission: Submission<'_>) -> Result<bool, JudgeError> {
        debug!(
            language = submission.language,
            problem_id = submission.problem_id,
            verdict = self.verdict,
            "mock judge evaluated submission"
        );
        Ok(self.verdict)
    }
}

/// Production implementation delegating to an external judge HTTP API.
pub struct HttpJudgeClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpJudgeClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            http_client: reqwest::Client::new(),
        }
    }
}

#[derive(serde::Serialize)]
struct JudgeRequest<'a> {
    problem_id: i64,
    language: &'a str,
    source: &'a str,
}

#[derive(serde::Deserialize)]
struct JudgeResponse {
    correct: bool,
}

#[async_trait]
impl JudgeClient for HttpJudgeClient {
    #[instrument(skip(self, submission), fields(problem_id = submission.problem_id))]
    async fn judge(&self, submission: Submission<'_>) -> Result<bool, JudgeError> {
        let payload = JudgeRequest {
            problem_id: submission.problem_id,
            language: submission.language,
            source: submission.source,
        };

        let response = self
            .http_client
            .post(format!("{}/judge", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| JudgeError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            error!(status = %response.status(), "judge API returned error");
            return Err(JudgeError::RequestFailed(format!(
                "judge API status {}",
                response.status()
            )));
        }

        let body: JudgeResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::RequestFailed(e.to_string()))?;

        Ok(body.correct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_judge_returns_configured_verdict() {
        let correct = LogJudgeClient { verdict: true };
        let incorrect = LogJudgeClient { verdict: false };
        let submission = Submission {
            language: "rust",
            source: "fn main() {}",
            problem_id: 1,
        };

        assert!(correct.judge(submission.clone()).await.unwrap());
        assert!(!incorrect.judge(submission).await.unwrap());
    }
}
