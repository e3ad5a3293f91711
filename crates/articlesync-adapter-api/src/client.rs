//! HTTP client for the article API.
//!
//! Endpoints:
//! - `GET {base}/articles/{id}` returns an [`Article`] as JSON
//! - `PUT {base}/articles/{id}` stores an [`Article`]

use super::encoding::encode_article_id;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// A stored article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Article identifier
    pub id: String,
    /// Headline
    #[serde(default)]
    pub title: String,
    /// Full body text, the document being edited
    #[serde(default)]
    pub body: String,
}

/// Article API client configuration.
#[derive(Debug, Clone)]
pub struct ArticleClientConfig {
    /// Base URL of the article API (e.g., <http://localhost:8080/api>)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Optional bearer token for authentication
    pub bearer_token: Option<String>,
    /// Custom CA certificate path for self-signed server certs (PEM format)
    pub ca_cert_path: Option<PathBuf>,
}

impl Default for ArticleClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout: Duration::from_secs(30),
            bearer_token: None,
            ca_cert_path: None,
        }
    }
}

/// HTTP client for fetching and saving articles.
pub struct ArticleClient {
    client: Client,
    config: ArticleClientConfig,
}

impl ArticleClient {
    /// Create a new article client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created, or if the CA
    /// certificate cannot be read or parsed.
    pub fn new(config: ArticleClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder().timeout(config.timeout);

        if config.base_url.starts_with("https://") {
            builder = builder.use_rustls_tls();

            if let Some(ca_path) = &config.ca_cert_path {
                let ca_cert = fs::read(ca_path).map_err(|e| {
                    ClientError::Init(format!(
                        "failed to read CA certificate {}: {e}",
                        ca_path.display()
                    ))
                })?;
                let cert = reqwest::Certificate::from_pem(&ca_cert).map_err(|e| {
                    ClientError::Init(format!("failed to parse CA certificate: {e}"))
                })?;
                builder = builder.add_root_certificate(cert);
                tracing::debug!(ca_path = %ca_path.display(), "Loaded custom CA certificate");
            }
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Init(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// URL of a single article.
    #[must_use]
    pub fn article_url(&self, id: &str) -> String {
        format!(
            "{}/articles/{}",
            self.config.base_url.trim_end_matches('/'),
            encode_article_id(id)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch an article.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn fetch_article(&self, id: &str) -> Result<Article, ClientError> {
        let url = self.article_url(id);
        tracing::debug!(article_id = id, url, "GET article");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Save an article.
    ///
    /// # Errors
    ///
    /// Returns error on network or API errors.
    pub async fn save_article(&self, article: &Article) -> Result<(), ClientError> {
        let url = self.article_url(&article.id);
        tracing::debug!(
            article_id = %article.id,
            url,
            body_len = article.body.len(),
            "PUT article"
        );

        let response = self
            .authorize(self.client.put(&url).json(article))
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ClientError::ApiError {
            status: response.status().as_u16(),
            message: response.text().await.unwrap_or_default(),
        })
    }
}

/// Errors that can occur with the article client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// HTTP request failed
    #[error("request error: {0}")]
    Request(String),
    /// API returned an error status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },
    /// Response parsing failed
    #[error("parse error: {0}")]
    Parse(String),
}
