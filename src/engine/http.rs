use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::engine::SimulationEngine;
use crate::prelude::Result;
use crate::req::HttpClient;
use crate::types::{Distribution, PreviewReply, SimulateReply, SimulationRequest};
use crate::{BaseUrl, Error};

/// Remote engine reached over JSON/HTTP.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    http_client: HttpClient,
}

impl HttpEngine {
    pub fn new(base_url: BaseUrl, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            http_client: HttpClient::new(base_url, timeout)?,
        })
    }

    pub fn with_client(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    pub fn base_url(&self) -> &str {
        &self.http_client.base_url
    }

    async fn send<T: Serialize + ?Sized>(&self, path: &'static str, body: &T) -> Result<String> {
        let data = serde_json::to_string(body).map_err(|e| Error::json_parse(e.to_string()))?;
        self.http_client.post(path, data).await
    }
}

#[async_trait]
impl SimulationEngine for HttpEngine {
    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulateReply> {
        let text = self.send("/simulate", request).await?;
        debug!(bytes = text.len(), "simulate reply");
        // an unreadable body is a failed exchange, not a contract breach
        serde_json::from_str(&text).map_err(|e| Error::transport(format!("unreadable reply: {e}")))
    }

    async fn preview(&self, distribution: &Distribution) -> Result<PreviewReply> {
        let text = self.send("/distribution_preview", distribution).await?;
        serde_json::from_str(&text).map_err(|e| Error::transport(format!("unreadable reply: {e}")))
    }

    fn label(&self) -> &'static str {
        "http"
    }
}
