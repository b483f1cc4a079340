//! JSON-RPC 2.0 client for the code-execution service.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{CompileOutput, CompilerBackend, SubmissionStatus};
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct JsonRpcCompiler {
    endpoint: String,
    user: String,
    password: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<Value>,
}

/// Every service result carries its own `error` field, `"OK"` on success
#[derive(Debug, Deserialize)]
struct SubmissionCreated {
    error: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    error: String,
    #[serde(default)]
    status: i64,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    error: String,
    #[serde(flatten)]
    output: CompileOutput,
}

fn service_error(message: impl std::fmt::Display) -> Error {
    Error::Compiler(139, format!("Compiler error: {}", message))
}

fn check_ok(error: &str) -> Result<()> {
    if error == "OK" {
        Ok(())
    } else {
        Err(service_error(error))
    }
}

impl JsonRpcCompiler {
    pub fn new(endpoint: String, user: String, password: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            endpoint,
            user,
            password,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    fn request_body(&self, method: &str, params: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(method, params))
            .send()
            .await
            .map_err(|e| service_error(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(service_error(format!("{} returned {}", method, response.status())));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| service_error(format!("invalid {} response: {}", method, e)))?;
        decode(method, body)
    }
}

fn decode<T>(method: &str, body: RpcResponse<T>) -> Result<T> {
    if let Some(error) = body.error.filter(|e| !e.is_null()) {
        return Err(service_error(error));
    }
    body.result
        .ok_or_else(|| service_error(format!("{} returned no result", method)))
}

#[async_trait]
impl CompilerBackend for JsonRpcCompiler {
    async fn submit(&self, language_id: u32, source: &str, input: &str) -> Result<String> {
        let created: SubmissionCreated = self
            .call(
                "createSubmission",
                json!([self.user, self.password, source, language_id, input, true, false]),
            )
            .await?;
        check_ok(&created.error)?;
        Ok(created.link)
    }

    async fn poll_status(&self, submission: &str) -> Result<SubmissionStatus> {
        let status: StatusResult = self
            .call(
                "getSubmissionStatus",
                json!([self.user, self.password, submission]),
            )
            .await?;
        check_ok(&status.error)?;
        Ok(if status.status == 0 {
            SubmissionStatus::Done
        } else {
            SubmissionStatus::Pending
        })
    }

    async fn fetch_details(&self, submission: &str) -> Result<CompileOutput> {
        let details: DetailsResult = self
            .call(
                "getSubmissionDetails",
                json!([self.user, self.password, submission, false, false, true, true, true]),
            )
            .await?;
        check_ok(&details.error)?;
        Ok(details.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn client() -> JsonRpcCompiler {
        JsonRpcCompiler::new("http://localhost:1/rpc".into(), "u".into(), "p".into()).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let rpc = client();
        let first = rpc.request_body("getSubmissionStatus", json!(["u", "p", "abc"]));
        let second = rpc.request_body("getSubmissionStatus", json!(["u", "p", "abc"]));

        assert_eq!(first["jsonrpc"], "2.0");
        assert_eq!(first["method"], "getSubmissionStatus");
        assert_eq!(first["params"], json!(["u", "p", "abc"]));
        assert_ne!(first["id"], second["id"]);
    }

    #[test]
    fn test_decode_details() {
        let body: RpcResponse<DetailsResult> = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": {
                "error": "OK",
                "output": "42\n",
                "stderr": "",
                "cmpinfo": "",
                "result": 15,
                "time": 0.02,
                "memory": 3120,
                "signal": 0
            }
        }))
        .unwrap();

        let details = decode("getSubmissionDetails", body).unwrap();
        check_ok(&details.error).unwrap();
        assert_eq!(details.output.output, "42\n");
        assert_eq!(details.output.memory, 3120);
    }

    #[test]
    fn test_service_errors() {
        let body: RpcResponse<SubmissionCreated> =
            serde_json::from_value(json!({"result": {"error": "AUTH_ERROR"}})).unwrap();
        let created = decode("createSubmission", body).unwrap();
        assert_eq!(check_ok(&created.error).unwrap_err().kind(), ErrorKind::Compiler);

        let body: RpcResponse<StatusResult> =
            serde_json::from_value(json!({"error": {"code": -32601, "message": "no method"}}))
                .unwrap();
        assert_eq!(
            decode("getSubmissionStatus", body).unwrap_err().kind(),
            ErrorKind::Compiler
        );
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let err = client().submit(4, "print(1)", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compiler);
    }
}
