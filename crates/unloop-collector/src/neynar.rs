use crate::api::{PageRequest, SocialGraphApi};
use crate::error::{UpstreamError, UpstreamResult};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};
use unloop_core::{ApiConfig, Result, SubjectId, UnloopError};

/// reqwest-backed client for the Neynar v2 read endpoints.
#[derive(Clone)]
pub struct NeynarClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    viewer_fid: u64,
}

impl NeynarClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                UnloopError::Config(
                    "Neynar API key is required. Set NEYNAR_API_KEY environment variable."
                        .to_string(),
                )
            })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| UnloopError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            viewer_fid: config.viewer_fid,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> UpstreamResult<Value> {
        debug!(url, ?query, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .header("api_key", self.api_key.expose_secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url, status = status.as_u16(), body = %body, "Neynar request rejected");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SocialGraphApi for NeynarClient {
    async fn lookup_profile(&self, subject: SubjectId) -> UpstreamResult<Value> {
        let query = [
            ("fids", subject.to_string()),
            ("viewer_fid", self.viewer_fid.to_string()),
        ];
        self.get_json(&self.url("farcaster/user/bulk"), &query).await
    }

    async fn fetch_page(&self, request: &PageRequest) -> UpstreamResult<Value> {
        let mut query = vec![
            ("fid", request.subject.to_string()),
            ("viewer_fid", self.viewer_fid.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(cursor) = &request.cursor {
            query.push(("cursor", cursor.clone()));
        }
        self.get_json(&self.url(request.direction.endpoint_path()), &query)
            .await
    }
}
