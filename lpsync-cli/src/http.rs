//! Shared `ureq` plumbing for the Launchpad and Jira clients.

use std::time::Duration;

use serde::de::DeserializeOwned;

use lpsync_sync::TrackerError;

const TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("lpsync/", env!("CARGO_PKG_VERSION"));

/// Longest error body quoted in an error message.
const BODY_EXCERPT: usize = 300;

pub fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}

/// Map a failed call to [`TrackerError::Request`], quoting the start of the error body.
pub fn request_err(operation: &'static str, err: ureq::Error) -> TrackerError {
    let message = match err {
        ureq::Error::Status(code, response) => {
            let url = response.get_url().to_owned();
            let body = response.into_string().unwrap_or_default();
            let excerpt: String = body.chars().take(BODY_EXCERPT).collect();
            format!("HTTP {code} from {url}: {excerpt}")
        }
        ureq::Error::Transport(transport) => transport.to_string(),
    };
    TrackerError::Request { operation, message }
}

/// Send `request` and decode a JSON body.
pub fn call_json<T: DeserializeOwned>(
    operation: &'static str,
    request: ureq::Request,
) -> Result<T, TrackerError> {
    let response = request.call().map_err(|e| request_err(operation, e))?;
    decode(operation, response)
}

/// Send `request` with a JSON body and decode a JSON answer.
pub fn send_json<T: DeserializeOwned>(
    operation: &'static str,
    request: ureq::Request,
    body: serde_json::Value,
) -> Result<T, TrackerError> {
    let response = request
        .send_json(body)
        .map_err(|e| request_err(operation, e))?;
    decode(operation, response)
}

/// Send `request` with a JSON body, ignoring the answer (`204 No Content` and friends).
pub fn send_json_unit(
    operation: &'static str,
    request: ureq::Request,
    body: serde_json::Value,
) -> Result<(), TrackerError> {
    request
        .send_json(body)
        .map_err(|e| request_err(operation, e))?;
    Ok(())
}

fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: ureq::Response,
) -> Result<T, TrackerError> {
    response.into_json().map_err(|e| TrackerError::Decode {
        operation,
        message: e.to_string(),
    })
}
