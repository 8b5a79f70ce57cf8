use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{prelude::*, BaseUrl, Error};

#[derive(Deserialize, Debug)]
struct ErrorData {
    error: String,
}

/// Thin JSON-over-HTTP client for the engine.
///
/// No retries: transport failures surface to the caller as-is.
#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
    pub base_url: String,
}

async fn parse_response(response: Response) -> Result<String> {
    let status_code = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| Error::transport(e.to_string()))?;

    if status_code < 400 {
        return Ok(text);
    }

    // Engines may reject with a non-2xx status and an {error} body.
    if let Ok(error_data) = serde_json::from_str::<ErrorData>(&text) {
        warn!(status = status_code, error = %error_data.error, "Engine rejected request");
        return Err(Error::Engine(error_data.error));
    }

    Err(Error::transport(format!("status {status_code}: {text}")))
}

impl HttpClient {
    pub fn new(base_url: BaseUrl, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: BaseUrl) -> Self {
        Self {
            client,
            base_url: base_url.get_url(),
        }
    }

    /// POST a JSON body and return the response text.
    pub async fn post(&self, url_path: &'static str, data: String) -> Result<String> {
        let full_url = format!("{}{url_path}", self.base_url);
        debug!(url = %full_url, bytes = data.len(), "POST");

        let response = self
            .client
            .post(&full_url)
            .header("Content-Type", "application/json")
            .body(data)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        parse_response(response).await
    }
}
