//! Backend HTTP client
//!
//! Every call walks a list of candidate base URLs derived from the
//! configured one, so a dev backend is reached whether it listens on http or
//! https and on `localhost` or `127.0.0.1`:
//!
//! 1. base as configured
//! 2. scheme swapped (http <-> https)
//! 3. host swapped (localhost <-> 127.0.0.1)
//! 4. scheme and host swapped
//!
//! The first 2xx response wins. A 2xx body that fails to parse ends the
//! sequence. Otherwise the first HTTP error is returned, or `Unreachable`
//! when no candidate answered at all.

use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::game::constants::leaderboard;
use crate::net::dto::{
    LeaderboardEntryDto, PagedScoresDto, SaveDto, SaveSnapshotDto, ScoreCreateDto, ScoreDto,
    ScoreQuery,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Parse error: {message}\nBody: {body}")]
    Parse { message: String, body: String },
    #[error("Cannot connect. Tried: {}", .tried.join(", "))]
    Unreachable { tried: Vec<String> },
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
    #[error("Invalid client config: {0}")]
    Config(String),
}

impl ClientError {
    fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Http { status: 404, .. })
    }
}

fn authority(scheme: &str, host: &str, port: Option<u16>) -> String {
    let default_port = match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    match port {
        Some(p) if Some(p) != default_port => format!("{}://{}:{}", scheme, host, p),
        _ => format!("{}://{}", scheme, host),
    }
}

/// Candidate base URLs in attempt order, de-duplicated case-insensitively
pub fn candidate_roots(base_url: &str) -> Vec<String> {
    let mut roots: Vec<String> = Vec::new();
    let mut add = |root: String| {
        let root = root.trim().trim_end_matches('/').to_string();
        if !root.is_empty() && !roots.iter().any(|r| r.eq_ignore_ascii_case(&root)) {
            roots.push(root);
        }
    };

    add(base_url.to_string());

    if let Ok(uri) = Url::parse(base_url.trim()) {
        if let Some(host) = uri.host_str() {
            let scheme = uri.scheme();
            let port = uri.port_or_known_default();
            let other_scheme = if scheme.eq_ignore_ascii_case("https") { "http" } else { "https" };
            let other_host = if host.eq_ignore_ascii_case("localhost") { "127.0.0.1" } else { "localhost" };

            add(authority(scheme, host, port));
            add(authority(other_scheme, host, port));
            add(authority(scheme, other_host, port));
            add(authority(other_scheme, other_host, port));
        }
    }

    roots
}

/// Join path segments onto a root, percent-encoding each segment
fn join(root: &str, segments: &[&str]) -> Option<Url> {
    let mut url = Url::parse(root).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().extend(segments);
    Some(url)
}

/// Client for the score/save backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.timeout)
            // DEV only: local backends run on self-signed certificates
            .danger_accept_invalid_certs(config.dev_bypass_cert)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Build from `API_BASE_URL`, `API_DEV_BYPASS_CERT` and `API_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ClientError> {
        let config = ClientConfig::load_or_default();
        config.validate().map_err(ClientError::Config)?;
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request to each candidate until one answers with 2xx.
    /// `Ok(None)` means a 2xx without a body (204).
    async fn send_with_fallback<T, F>(
        &self,
        method: Method,
        segments: &[&str],
        build: F,
    ) -> Result<Option<T>, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let mut tried = Vec::new();
        let mut first_err: Option<ClientError> = None;

        for root in candidate_roots(&self.base_url) {
            let Some(url) = join(&root, segments) else {
                debug!("Skipping unusable base URL {}", root);
                continue;
            };
            tried.push(url.to_string());

            let response = match build(self.http.request(method.clone(), url.clone())).send().await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Request to {} failed: {}", url, e);
                    continue;
                }
            };

            let status = response.status();
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) if status.is_success() => {
                    return Err(ClientError::Parse {
                        message: e.to_string(),
                        body: String::new(),
                    });
                }
                Err(_) => String::new(),
            };

            if status.is_success() {
                if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
                    return Ok(None);
                }
                return serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|e| ClientError::Parse {
                        message: e.to_string(),
                        body: text,
                    });
            }

            warn!("API error from {}: {} - {}", url, status, text);
            if first_err.is_none() {
                first_err = Some(ClientError::Http {
                    status: status.as_u16(),
                    body: text,
                });
            }
        }

        Err(first_err.unwrap_or(ClientError::Unreachable { tried }))
    }

    async fn send_expecting<T, F>(&self, method: Method, segments: &[&str], build: F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        self.send_with_fallback(method, segments, build)
            .await?
            .ok_or_else(|| ClientError::Parse {
                message: "Empty response body".to_string(),
                body: String::new(),
            })
    }

    /// POST /api/scores
    pub async fn post_score(&self, dto: &ScoreCreateDto) -> Result<ScoreDto, ClientError> {
        self.send_expecting(Method::POST, &["api", "scores"], |req| req.json(dto))
            .await
    }

    /// GET /api/scores/{id}
    pub async fn get_score(&self, id: i64) -> Result<Option<ScoreDto>, ClientError> {
        let id = id.to_string();
        match self
            .send_with_fallback(Method::GET, &["api", "scores", &id], |req| req)
            .await
        {
            Err(e) if e.is_not_found() => Ok(None),
            other => other,
        }
    }

    /// PUT /api/scores/{id}
    pub async fn update_score(&self, id: i64, dto: &ScoreCreateDto) -> Result<ScoreDto, ClientError> {
        let id = id.to_string();
        self.send_expecting(Method::PUT, &["api", "scores", &id], |req| req.json(dto))
            .await
    }

    /// DELETE /api/scores/{id}. Returns false if it did not exist.
    pub async fn delete_score(&self, id: i64) -> Result<bool, ClientError> {
        let id = id.to_string();
        match self
            .send_with_fallback::<serde_json::Value, _>(Method::DELETE, &["api", "scores", &id], |req| req)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// GET /api/scores with filters, paging and sort
    pub async fn list_scores(&self, query: &ScoreQuery) -> Result<PagedScoresDto, ClientError> {
        self.send_expecting(Method::GET, &["api", "scores"], |req| req.query(query))
            .await
    }

    /// GET /api/scores/top/{n}, n clamped to 1..=100
    pub async fn get_top(&self, n: i64) -> Result<Vec<LeaderboardEntryDto>, ClientError> {
        let n = n.clamp(1, leaderboard::TOP_MAX).to_string();
        self.send_expecting(Method::GET, &["api", "scores", "top", &n], |req| req)
            .await
    }

    /// GET /api/highscore. `None` when no score exists yet.
    pub async fn get_highscore(&self) -> Result<Option<LeaderboardEntryDto>, ClientError> {
        self.send_with_fallback(Method::GET, &["api", "highscore"], |req| req)
            .await
    }

    /// GET /api/saves/{playerName}. `None` when the player has no save.
    pub async fn get_save(&self, player_name: &str) -> Result<Option<SaveDto>, ClientError> {
        let name = player_name.trim();
        match self
            .send_with_fallback(Method::GET, &["api", "saves", name], |req| req)
            .await
        {
            Err(e) if e.is_not_found() => Ok(None),
            other => other,
        }
    }

    /// POST /api/saves (upsert by player name)
    pub async fn upsert_save(&self, dto: &SaveSnapshotDto) -> Result<SaveDto, ClientError> {
        self.send_expecting(Method::POST, &["api", "saves"], |req| req.json(dto))
            .await
    }

    /// DELETE /api/saves/{playerName}. Returns false if there was no save.
    pub async fn delete_save(&self, player_name: &str) -> Result<bool, ClientError> {
        let name = player_name.trim();
        match self
            .send_with_fallback::<serde_json::Value, _>(Method::DELETE, &["api", "saves", name], |req| req)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
