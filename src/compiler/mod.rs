//! External code-execution service.
//!
//! [`Compiler`] drives any [`CompilerBackend`]: submit, poll until the
//! submission is done, then fetch the run details. It never touches the
//! database, so callers must not hold a connection across `compile`.

mod jsonrpc;

pub use jsonrpc::JsonRpcCompiler;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CompilerConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Done,
}

/// Result of running a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOutput {
    /// Program stdout
    pub output: String,
    pub stderr: String,
    /// Compiler diagnostics
    pub cmpinfo: String,
    /// Service result code (e.g. accepted, compilation error, runtime error)
    pub result: i64,
    /// Run time in seconds
    pub time: f64,
    /// Peak memory in KiB
    pub memory: i64,
    /// Signal that terminated the program, 0 if none
    pub signal: i64,
}

#[async_trait]
pub trait CompilerBackend: Send + Sync {
    /// Submit a program; returns the service's reference for the submission
    async fn submit(&self, language_id: u32, source: &str, input: &str) -> Result<String>;

    async fn poll_status(&self, submission: &str) -> Result<SubmissionStatus>;

    async fn fetch_details(&self, submission: &str) -> Result<CompileOutput>;
}

/// Backend used when no compiler endpoint is configured
pub struct UnconfiguredCompiler;

impl UnconfiguredCompiler {
    fn error() -> Error {
        Error::NotConfigured(140, "Compiler service is not configured".to_string())
    }
}

#[async_trait]
impl CompilerBackend for UnconfiguredCompiler {
    async fn submit(&self, _language_id: u32, _source: &str, _input: &str) -> Result<String> {
        Err(Self::error())
    }

    async fn poll_status(&self, _submission: &str) -> Result<SubmissionStatus> {
        Err(Self::error())
    }

    async fn fetch_details(&self, _submission: &str) -> Result<CompileOutput> {
        Err(Self::error())
    }
}

pub struct Compiler {
    backend: Arc<dyn CompilerBackend>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl Compiler {
    pub fn new(backend: Arc<dyn CompilerBackend>, poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            backend,
            poll_interval,
            max_attempts,
        }
    }

    /// Build the compiler described by the configuration. Without an
    /// endpoint every compile fails with `NotConfigured`.
    pub fn from_config(config: &CompilerConfig) -> anyhow::Result<Self> {
        let backend: Arc<dyn CompilerBackend> = match &config.endpoint {
            Some(endpoint) => Arc::new(JsonRpcCompiler::new(
                endpoint.clone(),
                config.user.clone(),
                config.password.clone(),
            )?),
            None => {
                tracing::warn!("No compiler endpoint configured; compile requests will fail");
                Arc::new(UnconfiguredCompiler)
            }
        };
        Ok(Self::new(
            backend,
            config.poll_interval(),
            config.max_poll_attempts,
        ))
    }

    /// Submit and wait for the result. Gives up with `Timeout` after
    /// `max_attempts` polls; the submission itself is left to the service.
    pub async fn compile(&self, language_id: u32, source: &str, input: &str) -> Result<CompileOutput> {
        let submission = self.backend.submit(language_id, source, input).await?;
        tracing::debug!(submission = %submission, language_id = language_id, "Submitted program");

        for attempt in 1..=self.max_attempts {
            match self.backend.poll_status(&submission).await? {
                SubmissionStatus::Done => return self.backend.fetch_details(&submission).await,
                SubmissionStatus::Pending => {
                    tracing::trace!(submission = %submission, attempt = attempt, "Submission pending");
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
            }
        }

        tracing::warn!(
            submission = %submission,
            attempts = self.max_attempts,
            "Gave up waiting for submission"
        );
        Err(Error::Timeout(
            138,
            "Compiler did not finish in time".to_string(),
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeBackend;
    use super::*;
    use crate::error::ErrorKind;

    fn compiler(backend: Arc<FakeBackend>, max_attempts: u32) -> Compiler {
        Compiler::new(backend, Duration::from_millis(1), max_attempts)
    }

    #[tokio::test]
    async fn test_polls_until_done() {
        let backend = Arc::new(FakeBackend::done_after(2));
        let output = compiler(backend.clone(), 5).compile(4, "print(1)", "").await.unwrap();

        assert_eq!(output.output, "ran sub-4");
        assert_eq!(backend.poll_count(), 3);
    }

    #[tokio::test]
    async fn test_times_out_after_max_attempts() {
        let backend = Arc::new(FakeBackend::done_after(u32::MAX));
        let err = compiler(backend.clone(), 3).compile(4, "loop", "").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(backend.poll_count(), 3);
    }

    #[tokio::test]
    async fn test_timeout_returns_without_a_trailing_wait() {
        let backend = Arc::new(FakeBackend::done_after(u32::MAX));
        let compiler = Compiler::new(backend.clone(), Duration::from_secs(30), 1);

        let err = tokio::time::timeout(Duration::from_secs(5), compiler.compile(4, "loop", ""))
            .await
            .expect("compile waited after the last poll")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(backend.poll_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_error_propagates() {
        let backend = Arc::new(FakeBackend {
            reject_submit: true,
            ..Default::default()
        });
        let err = compiler(backend.clone(), 3).compile(999, "x", "").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Compiler);
        assert_eq!(backend.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_backend() {
        let compiler = Compiler::from_config(&CompilerConfig::default()).unwrap();
        let err = compiler.compile(4, "print(1)", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }

    #[test]
    fn test_output_tolerates_missing_fields() {
        let output: CompileOutput =
            serde_json::from_str(r#"{"output":"hi\n","result":15,"time":0.01}"#).unwrap();
        assert_eq!(output.output, "hi\n");
        assert_eq!(output.stderr, "");
        assert_eq!(output.signal, 0);
    }
}
