//! Status handling and client construction shared by the provider clients.

use reqwest::{Response, StatusCode, header::RETRY_AFTER};

use crate::error::EnvError;

/// Wait assumed when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Pass successful responses through; map 429 to [`EnvError::RateLimited`]
/// and any other failure status to [`EnvError::Api`].
pub async fn check_response(resp: Response) -> Result<Response, EnvError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok()?.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(EnvError::RateLimited { retry_after_secs });
    }
    if status.is_success() {
        return Ok(resp);
    }
    Err(EnvError::Api {
        status: status.as_u16(),
        message: resp.text().await.unwrap_or_default(),
    })
}

/// # Errors
///
/// Returns [`EnvError::Http`] if the TLS backend cannot be initialised.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, EnvError> {
    Ok(reqwest::Client::builder().user_agent(user_agent).build()?)
}
