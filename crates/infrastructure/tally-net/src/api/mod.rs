pub mod dataset;
pub mod gateway;
pub mod monitoring;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// HTTP client shared by the console clients. Connects fail fast; requests
/// themselves carry no deadline, since a chat round trip with cold synthesis
/// can take arbitrarily long.
pub fn default_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()
}

/// Passes 2xx responses through. Anything else becomes a rejection carrying
/// the backend's `detail` field when the body has one, or a bare status
/// line when it does not.
pub(crate) async fn expect_ok(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp
        .bytes()
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        .and_then(|value| value.get("detail").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    Err(ApiError::Rejected {
        status: status.as_u16(),
        detail,
    })
}

pub(crate) async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Unwraps the `{ok, error?}` acknowledgement flavour: `ok: false` becomes a
/// rejection carrying `error`, everything else yields the body for further
/// decoding.
pub(crate) fn expect_acked(value: Value) -> Result<Value, ApiError> {
    match value.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(value),
        _ => {
            let detail = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned();
            Err(ApiError::Rejected {
                status: 200,
                detail,
            })
        }
    }
}
