use crate::client::log_store::{body_error, transport_error};
use crate::client::TransportError;
use serde::{Deserialize, Serialize};

/// Identity of the remote job: function name plus version/alias qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    pub function: String,
    pub qualifier: String,
}

impl JobRef {
    pub fn new(function: &str, qualifier: &str) -> Self {
        Self {
            function: function.to_string(),
            qualifier: qualifier.to_string(),
        }
    }
}

impl std::fmt::Display for JobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.function, self.qualifier)
    }
}

/// Whether the execution substrate behind the job is ready to run it.
/// Distinct from the job's own completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    Pending,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    pub status_code: u16,
}

/// Remote invocation surface. `invoke` requests a synchronous response;
/// the returned status code only proves the transport round trip, never
/// the job's success.
pub trait JobInvoker {
    fn invoke(&self, job: &JobRef, payload: &[u8]) -> Result<InvokeResponse, TransportError>;
    fn activation_state(&self, job: &JobRef) -> Result<ActivationState, TransportError>;
    fn declared_timeout_seconds(&self, job: &JobRef) -> Result<u64, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpInvoker {
    api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ActivationData {
    state: ActivationState,
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigurationData {
    timeout_seconds: u64,
}

impl HttpInvoker {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn function_endpoint(&self, job: &JobRef, suffix: &str) -> String {
        format!(
            "{}/functions/{}/{}?qualifier={}",
            self.api_base,
            urlencoding::encode(&job.function),
            suffix,
            urlencoding::encode(&job.qualifier)
        )
    }
}

impl JobInvoker for HttpInvoker {
    fn invoke(&self, job: &JobRef, payload: &[u8]) -> Result<InvokeResponse, TransportError> {
        let url = format!(
            "{}&mode=synchronous",
            self.function_endpoint(job, "invocations")
        );
        let response = ureq::post(&url)
            .set("Content-Type", "application/json")
            .send_bytes(payload)
            .map_err(|err| transport_error("invoke", err))?;
        Ok(InvokeResponse {
            status_code: response.status(),
        })
    }

    fn activation_state(&self, job: &JobRef) -> Result<ActivationState, TransportError> {
        let url = self.function_endpoint(job, "activation");
        let response = ureq::get(&url)
            .call()
            .map_err(|err| transport_error("get activation state", err))?;
        let data: ActivationData = response
            .into_json()
            .map_err(|err| body_error("get activation state", err))?;
        Ok(data.state)
    }

    fn declared_timeout_seconds(&self, job: &JobRef) -> Result<u64, TransportError> {
        let url = self.function_endpoint(job, "configuration");
        let response = ureq::get(&url)
            .call()
            .map_err(|err| transport_error("get configuration", err))?;
        let data: ConfigurationData = response
            .into_json()
            .map_err(|err| body_error("get configuration", err))?;
        Ok(data.timeout_seconds)
    }
}
