// HTTP client for the retrieval backend

use std::path::{Path, PathBuf};

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::store::GenerationConfig;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub upload_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveResponse {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub result: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttestationResponse {
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Serialize)]
struct ContextRequest<'a> {
    context: &'a str,
}

/// Optional error body; only `detail` is inspected.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum BaseUrlError {
    #[error("invalid backend URL {url:?}: {reason}")]
    Invalid { url: String, reason: String },
}

/// Cheap to clone; request tasks take their own copy.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, BaseUrlError> {
        let base = Url::parse(base_url).map_err(|e| BaseUrlError::Invalid {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(BaseUrlError::Invalid {
                url: base_url.to_string(),
                reason: "expected an http(s) URL".to_string(),
            });
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn query(
        &self,
        query_text: &str,
        config: Option<&GenerationConfig>,
    ) -> Result<QueryResponse, ApiError> {
        let mut params = vec![("query_text", query_text.to_string())];
        if let Some(config) = config {
            let encoded = serde_json::to_string(config)
                .map_err(|e| ApiError::Malformed(format!("could not encode config: {}", e)))?;
            params.push(("config", encoded));
        }

        let response = self
            .http
            .get(self.endpoint(&["query"]))
            .query(&params)
            .send()
            .await?;
        read_json(response).await
    }

    /// Upload files as multipart. A single file goes in field `file`, several
    /// files each get a `files` part.
    pub async fn upload(&self, paths: &[PathBuf]) -> Result<UploadResponse, ApiError> {
        let field = if paths.len() == 1 { "file" } else { "files" };
        let mut form = Form::new();
        for path in paths {
            form = form.part(field, file_part(path).await?);
        }

        let response = self
            .http
            .post(self.endpoint(&["upload"]))
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn retrieve(&self, cid: &str) -> Result<RetrieveResponse, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&["retrieve", cid]))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn upload_db(&self) -> Result<UploadResponse, ApiError> {
        let response = self
            .http
            .post(self.endpoint(&["upload-db"]))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse, ApiError> {
        let response = self
            .http
            .post(self.endpoint(&["search"]))
            .json(&SearchRequest { query })
            .send()
            .await?;
        read_json(response).await
    }

    /// Forward text to the backend's chat context. Any 2xx counts as success.
    pub async fn send_context(&self, context: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.endpoint(&["chat", "context"]))
            .json(&ContextRequest { context })
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    pub async fn attestation(&self) -> Result<AttestationResponse, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&["attestation"]))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&["health"]))
            .send()
            .await?;
        read_json(response).await
    }
}

async fn file_part(path: &Path) -> Result<Part, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| ApiError::LocalFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    debug!(file = %name, bytes = bytes.len(), "attaching upload part");
    Ok(Part::bytes(bytes).file_name(name))
}

/// Turn a non-2xx response into [`ApiError::Status`], keeping `detail` if the
/// body carries one.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.detail)
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
    warn!(status = status.as_u16(), ?detail, "backend returned error status");
    Err(ApiError::Status {
        status: status.as_u16(),
        detail,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Malformed(e.to_string()))
}
