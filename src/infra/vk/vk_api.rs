use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::moderation::PlatformError;

pub const DEFAULT_API_VERSION: &str = "5.131";

/// Minimal VK API client: form-encoded POSTs to `/method/<name>` and the
/// `{response}` / `{error}` envelope. Typed calls live in the adapters.
#[derive(Clone)]
pub struct VkApiClient {
    client: Client,
    token: String,
    version: String,
    base_url: String,
}

impl VkApiClient {
    pub fn new(token: String, version: String) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .user_agent("LikeGuardBot/0.1")
            .build()
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            token,
            version,
            base_url: "https://api.vk.com/method".to_string(),
        })
    }

    /// Shared HTTP client, reused by the long poll loop.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// One raw API call. No throttling or retries here.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let url = format!("{}/{}", self.base_url, method);

        let mut form: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        form.push(("access_token", self.token.as_str()));
        form.push(("v", self.version.as_str()));

        let resp = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PlatformError::Transport(format!(
                "VK returned {} for {}",
                status, method
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        decode_envelope(method, &body)
    }
}

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    response: Option<T>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    error_code: i64,
    error_msg: String,
}

/// Unwrap a VK response body into its payload or API error.
pub fn decode_envelope<T: DeserializeOwned>(method: &str, body: &str) -> Result<T, PlatformError> {
    let envelope: ApiEnvelope<T> = serde_json::from_str(body)
        .map_err(|e| PlatformError::Decode(format!("{}: {}", method, e)))?;

    if let Some(err) = envelope.error {
        return Err(PlatformError::Api {
            code: err.error_code,
            message: err.error_msg,
        });
    }

    envelope
        .response
        .ok_or_else(|| PlatformError::Decode(format!("{}: missing response", method)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_response() {
        let ids: Vec<i64> = decode_envelope("test", r#"{"response":[1,2,3]}"#).unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_api_error() {
        let body = r#"{"error":{"error_code":6,"error_msg":"Too many requests per second","request_params":[]}}"#;
        let err = decode_envelope::<Vec<i64>>("wall.getById", body).unwrap_err();

        assert_eq!(
            err,
            PlatformError::Api {
                code: 6,
                message: "Too many requests per second".to_string()
            }
        );
        assert_eq!(
            err.to_string(),
            "VK API error 6: Too many requests per second"
        );
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_envelope::<Vec<i64>>("users.get", "<html>").unwrap_err();
        assert!(matches!(err, PlatformError::Decode(_)));

        let err = decode_envelope::<Vec<i64>>("users.get", "{}").unwrap_err();
        assert_eq!(
            err,
            PlatformError::Decode("users.get: missing response".to_string())
        );
    }
}
