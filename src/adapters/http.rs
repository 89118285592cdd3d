use crate::domain::model::DeploymentTarget;
use crate::domain::ports::ControlChannel;
use crate::utils::error::{RemoteError, Result};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CallEnvelope<'a> {
    service: &'a str,
    method: &'a str,
    args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ReplyEnvelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Control channel speaking JSON over HTTP to a container gateway.
#[derive(Debug, Clone)]
pub struct HttpChannel {
    client: Client,
    endpoint: String,
}

impl HttpChannel {
    pub fn new(target: &DeploymentTarget, timeout: Option<Duration>) -> Result<Self> {
        Self::with_endpoint(format!("http://{}:{}/", target.host, target.port), timeout)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = endpoint.into();
        validate_url("container", &endpoint)?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| crate::utils::error::DeployError::Config {
            message: format!("cannot build HTTP client: {}", e),
        })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ControlChannel for HttpChannel {
    async fn call(&self, method: &str, args: Vec<Value>) -> std::result::Result<Value, RemoteError> {
        let envelope = CallEnvelope {
            service: "",
            method,
            args,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| RemoteError::new(method, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::new(method, format!("HTTP {}", status)));
        }

        let reply: ReplyEnvelope = response
            .json()
            .await
            .map_err(|e| RemoteError::new(method, format!("invalid reply: {}", e)))?;

        match reply.error {
            Some(message) => Err(RemoteError::new(method, message)),
            None => Ok(reply.result),
        }
    }
}
