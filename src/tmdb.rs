//! TMDB v3 access: the `MetadataSource` seam and its reqwest implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::media::{
    ApiError, CastMember, CollectionResult, Credits, CrewMember, Genre, GenreCatalog, MediaId,
    MediaItem, TmdbListResponse, TmdbMediaResult, Video,
};
use crate::settings::AppSettings;

pub type Params<'a> = [(&'a str, String)];

#[derive(Debug, Clone, Deserialize)]
struct GenreListResponse {
    genres: Vec<Genre>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCreditsResponse {
    #[serde(default)]
    cast: Vec<TmdbCastMember>,
    #[serde(default)]
    crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCastMember {
    name: String,
    #[serde(default)]
    character: String,
    profile_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TmdbCrewMember {
    name: String,
    #[serde(default)]
    job: String,
}

#[derive(Debug, Clone, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    results: Vec<Video>,
}

impl From<TmdbCreditsResponse> for Credits {
    fn from(response: TmdbCreditsResponse) -> Self {
        Self {
            cast: response
                .cast
                .into_iter()
                .map(|c| CastMember {
                    name: c.name,
                    character: c.character,
                    profile_path: c.profile_path.filter(|p| !p.is_empty()),
                })
                .collect(),
            crew: response
                .crew
                .into_iter()
                .map(|c| CrewMember {
                    name: c.name,
                    job: c.job,
                })
                .collect(),
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Anything that can answer TMDB-shaped requests.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// GET `endpoint` with `params` and return the JSON body.
    async fn fetch(&self, endpoint: &str, params: &Params<'_>) -> Result<Value, ApiError>;

    async fn trending(&self, page: u32) -> Result<CollectionResult, ApiError> {
        let value = self
            .fetch("/trending/movie/week", &[("page", page.to_string())])
            .await?;
        Ok(decode::<TmdbListResponse>(value)?.into())
    }

    async fn discover(&self, page: u32, params: &Params<'_>) -> Result<CollectionResult, ApiError> {
        let mut all = vec![("page", page.to_string())];
        all.extend_from_slice(params);
        let value = self.fetch("/discover/movie", &all).await?;
        Ok(decode::<TmdbListResponse>(value)?.into())
    }

    async fn search(&self, query: &str, page: u32) -> Result<CollectionResult, ApiError> {
        let value = self
            .fetch(
                "/search/movie",
                &[("query", query.to_string()), ("page", page.to_string())],
            )
            .await?;
        Ok(decode::<TmdbListResponse>(value)?.into())
    }

    async fn details(&self, id: MediaId) -> Result<MediaItem, ApiError> {
        let value = self
            .fetch(
                &format!("/movie/{}", id),
                &[(
                    "append_to_response",
                    String::from("credits,videos,images,similar"),
                )],
            )
            .await?;
        Ok(decode::<TmdbMediaResult>(value)?.into())
    }

    async fn credits(&self, id: MediaId) -> Result<Credits, ApiError> {
        let value = self.fetch(&format!("/movie/{}/credits", id), &[]).await?;
        Ok(decode::<TmdbCreditsResponse>(value)?.into())
    }

    async fn videos(&self, id: MediaId) -> Result<Vec<Video>, ApiError> {
        let value = self.fetch(&format!("/movie/{}/videos", id), &[]).await?;
        Ok(decode::<VideosResponse>(value)?.results)
    }

    async fn similar(&self, id: MediaId, page: u32) -> Result<CollectionResult, ApiError> {
        let value = self
            .fetch(
                &format!("/movie/{}/similar", id),
                &[("page", page.to_string())],
            )
            .await?;
        Ok(decode::<TmdbListResponse>(value)?.into())
    }

    async fn genres(&self) -> Result<GenreCatalog, ApiError> {
        let value = self.fetch("/genre/movie/list", &[]).await?;
        Ok(GenreCatalog::from_genres(decode::<GenreListResponse>(value)?.genres))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    Poster,
    PosterLarge,
    BackdropLarge,
    Profile,
}

impl ImageSize {
    pub fn token(self) -> &'static str {
        match self {
            ImageSize::Profile => "w185",
            ImageSize::Poster => "w342",
            ImageSize::PosterLarge => "w500",
            ImageSize::BackdropLarge => "w1280",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    base_url: String,
}

impl ImageConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URLs pass through untouched.
    pub fn url(&self, path: &str, size: ImageSize) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let separator = if path.starts_with('/') { "" } else { "/" };
        format!("{}/{}{}{}", self.base_url, size.token(), separator, path)
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self::new(&AppSettings::default().image_base)
    }
}

pub async fn fetch_image_bytes(url: String) -> Result<Vec<u8>, String> {
    reqwest::get(&url)
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| e.to_string())
}

#[derive(Clone)]
pub struct TmdbClient {
    base_url: String,
    api_key: String,
    bearer: Option<String>,
    language: String,
    region: String,
    http_client: reqwest::Client,
}

impl TmdbClient {
    pub fn from_settings(settings: &AppSettings) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            api_key: settings.api_key.trim().to_string(),
            bearer: settings.bearer().map(str::to_string),
            language: settings.language.clone(),
            region: settings.region.clone(),
            http_client,
        }
    }

    /// Query string for a call: credential (unless a bearer header is used),
    /// language and region, then caller params. Empty values are dropped and a
    /// repeated key keeps its last value.
    pub fn query_params(&self, params: &Params<'_>) -> Vec<(String, String)> {
        let mut query: Vec<(String, String)> = Vec::with_capacity(params.len() + 3);
        let mut set = |key: &str, value: &str| {
            if value.trim().is_empty() {
                return;
            }
            match query.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value.to_string(),
                None => query.push((key.to_string(), value.to_string())),
            }
        };
        if self.bearer.is_none() {
            set("api_key", &self.api_key);
        }
        set("language", &self.language);
        set("region", &self.region);
        for (key, value) in params {
            set(key, value);
        }
        query
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    async fn fetch(&self, endpoint: &str, params: &Params<'_>) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let started = Instant::now();

        let mut request = self.http_client.get(&url).query(&self.query_params(params));
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        debug!(
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "TMDB request"
        );

        if !status.is_success() {
            return Err(ApiError::Remote {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response.json().await.map_err(|e| {
            if e.is_decode() {
                ApiError::Decode(e.to_string())
            } else {
                ApiError::Network(e.to_string())
            }
        })
    }
}
