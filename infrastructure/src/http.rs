use domain::error::{CollaboratorError, CollaboratorResult};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_BODY: usize = 512;

/// One pooled HTTP client, shared by every adapter built from the same config.
pub fn shared_client() -> CollaboratorResult<Arc<Client>> {
    let client = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
    Ok(Arc::new(client))
}

pub fn transport_error(err: reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Timeout(REQUEST_TIMEOUT)
    } else {
        CollaboratorError::Transport(err.to_string())
    }
}

/// Map non-2xx to `Status` and decode the body as JSON.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> CollaboratorResult<T> {
    let response = ensure_success(response).await?;
    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|e| CollaboratorError::Decode(e.to_string()))
}

pub async fn ensure_success(response: Response) -> CollaboratorResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    Err(CollaboratorError::status(status.as_u16(), body))
}

pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
