//! 各接口的请求处理函数。

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    Endpoint, ID_REQUIRED, QUERY_REQUIRED,
    model::{SearchQuery, song::Song},
    search::ChainOutcome,
    server::{AppState, error::ApiError},
};

const SONGS_FAILED: &str = "Failed to fetch songs";
const SONG_DETAILS_FAILED: &str = "Failed to fetch song details";
const TRENDING_FAILED: &str = "Failed to fetch trending";
const YOUTUBE_FAILED: &str = "YouTube search failed";
const YOUTUBE_MUSIC_FAILED: &str = "YouTube Music search failed";
const SOUNDCLOUD_FAILED: &str = "SoundCloud search failed";
const STREAM_FAILED: &str = "Failed to get stream URL";

/// 搜索接口的查询参数。
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// 关键词。
    pub query: Option<String>,
    /// 页码。
    pub page: Option<u32>,
    /// 每页数量。
    pub limit: Option<u32>,
}

/// 流式接口的查询参数。
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    /// YouTube 视频 ID。
    pub id: Option<String>,
}

/// 列表接口的响应，形如 `{"data": {"results": [...]}, "source": "..."}`。
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    data: SearchData,
    source: &'static str,
}

#[derive(Debug, Serialize)]
struct SearchData {
    results: Vec<Song>,
}

impl From<ChainOutcome> for SearchResponse {
    fn from(outcome: ChainOutcome) -> Self {
        Self {
            data: SearchData {
                results: outcome.songs,
            },
            source: outcome.source,
        }
    }
}

/// 歌曲详情接口的响应，形如 `{"data": [Song]}`。
#[derive(Debug, Serialize)]
pub struct SongDetailsResponse {
    data: Vec<Song>,
}

/// 健康检查的响应。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    environment: String,
    platform: &'static str,
    soundcloud_configured: bool,
    version: &'static str,
}

fn failure(endpoint: &str, message: &str, err: crate::error::MusicBridgeError) -> ApiError {
    error!("[{endpoint}] {message}: {err}");
    ApiError::from_domain(message, err)
}

async fn run_search(
    state: &AppState,
    endpoint: Endpoint,
    params: Result<Query<SearchParams>, QueryRejection>,
    failure_message: &str,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params?;

    let query = params
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(QUERY_REQUIRED))?;

    let search = SearchQuery {
        query,
        page: params.page,
        limit: params.limit,
    };

    let outcome = state
        .bridge
        .search(endpoint, &search)
        .await
        .map_err(|e| failure(&endpoint.to_string(), failure_message, e))?;

    info!(
        "[{endpoint}] '{}' 由 {} 返回 {} 条结果。",
        search.query,
        outcome.source,
        outcome.songs.len()
    );
    Ok(Json(outcome.into()))
}

/// `GET /api/search/songs`
pub async fn search_songs(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_search(&state, Endpoint::Songs, params, SONGS_FAILED).await
}

/// `GET /api/youtube/search`
pub async fn youtube_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_search(&state, Endpoint::YouTube, params, YOUTUBE_FAILED).await
}

/// `GET /api/youtube-music/search`
pub async fn youtube_music_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_search(&state, Endpoint::YouTubeMusic, params, YOUTUBE_MUSIC_FAILED).await
}

/// `GET /api/soundcloud/search`
pub async fn soundcloud_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_search(&state, Endpoint::SoundCloud, params, SOUNDCLOUD_FAILED).await
}

/// `GET /api/trending`
pub async fn trending(State(state): State<AppState>) -> Result<Json<SearchResponse>, ApiError> {
    let outcome = state
        .bridge
        .trending()
        .await
        .map_err(|e| failure("trending", TRENDING_FAILED, e))?;
    Ok(Json(outcome.into()))
}

/// `GET /api/songs/{id}`
pub async fn song_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SongDetailsResponse>, ApiError> {
    let song = state
        .bridge
        .song_details(&id)
        .await
        .map_err(|e| failure("songs", SONG_DETAILS_FAILED, e))?;
    Ok(Json(SongDetailsResponse { data: vec![song] }))
}

/// `GET /api/youtube/stream`
///
/// 只有在收到上游首个数据块后才会发送响应头；在此之前的任何失败都返回 JSON 错误。
pub async fn youtube_stream(
    State(state): State<AppState>,
    params: Result<Query<StreamParams>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let id = params
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(ID_REQUIRED))?;
    let range = headers.get(RANGE).and_then(|v| v.to_str().ok());

    let stream = state
        .bridge
        .open_stream(&id, range)
        .await
        .map_err(|e| failure("stream", STREAM_FAILED, e))?;

    let mut builder = Response::builder()
        .status(stream.status)
        .header(CONTENT_TYPE, HeaderValue::from_static(stream.content_type));
    if stream.accept_ranges {
        builder = builder.header(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    if let Some(len) = stream.content_length {
        builder = builder.header(CONTENT_LENGTH, len);
    }
    if let Some(content_range) = &stream.content_range {
        builder = builder.header(CONTENT_RANGE, content_range);
    }

    builder.body(Body::from_stream(stream.body)).map_err(|e| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, STREAM_FAILED).with_details(e.to_string())
    })
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        environment: state.environment.to_string(),
        platform: std::env::consts::OS,
        soundcloud_configured: state.bridge.soundcloud_configured(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// 未匹配的 `/api/*` 路径。
pub async fn api_not_found() -> impl IntoResponse {
    ApiError::new(StatusCode::NOT_FOUND, "API route not found")
}
