//! 此模块实现了与 SoundCloud 平台进行交互的 `Provider`。
//!
//! SoundCloud 的直链需要额外的鉴权调用才能解析，
//! 因此这里返回的可播放地址是音轨页面，交由播放端的 SoundCloud 播放器处理。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{
    error::{MusicBridgeError, Result},
    model::{
        SearchQuery,
        song::{MediaLink, Song, normalize_songs},
    },
    providers::{Provider, ProviderKind, decode_records},
};

pub mod models;

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 50;
const CHART_GENRE: &str = "soundcloud:genres:all-music";

/// SoundCloud 的客户端凭据。
///
/// 凭据在启动时确定，请求处理过程中不再读取环境变量。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundCloudCredentials {
    /// 没有配置凭据，所有调用都会以 `Configuration` 错误失败。
    Unconfigured,
    /// 已配置的 `client_id`。
    ClientId(String),
}

impl SoundCloudCredentials {
    /// 从可选的凭据字符串构造，空字符串视为未配置。
    pub fn from_option(client_id: Option<&str>) -> Self {
        match client_id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::ClientId(id.to_string()),
            _ => Self::Unconfigured,
        }
    }

    /// 是否已配置凭据。
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::ClientId(_))
    }
}

/// SoundCloud v2 API 的客户端实现。
#[derive(Debug, Clone)]
pub struct SoundCloudClient {
    base_url: String,
    credentials: SoundCloudCredentials,
    http_client: Client,
}

impl SoundCloudClient {
    /// 创建一个新的 `SoundCloudClient` 实例。
    ///
    /// # 参数
    /// * `base_url` - API 根地址，通常为 `https://api-v2.soundcloud.com`。
    /// * `credentials` - 客户端凭据。
    /// * `timeout` - 单次请求的超时。
    pub fn new(
        base_url: impl Into<String>,
        credentials: SoundCloudCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            http_client,
        })
    }

    fn client_id(&self) -> Result<&str> {
        match &self.credentials {
            SoundCloudCredentials::ClientId(id) => Ok(id),
            SoundCloudCredentials::Unconfigured => Err(MusicBridgeError::Configuration(
                "未配置 SOUNDCLOUD_CLIENT_ID".to_string(),
            )),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let client_id = self.client_id()?;
        let url = format!("{}{path}", self.base_url);
        debug!("[SoundCloud] GET {url}");

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("client_id", client_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MusicBridgeError::ApiError(format!(
                "SoundCloud {path} (HTTP {status})"
            )));
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Provider for SoundCloudClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::SoundCloud
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_configured()
    }

    async fn search_songs(&self, query: &SearchQuery) -> Result<Vec<Song>> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let params = [
            ("q", query.query.clone()),
            ("limit", limit.to_string()),
            ("offset", "0".to_string()),
        ];

        let resp: models::TrackCollection = self.get_json("/search/tracks", &params).await?;
        info!(
            "[SoundCloud] 搜索 '{}' 返回 {} 条结果。",
            query.query,
            resp.collection.len()
        );

        let tracks: Vec<models::Track> = decode_records(self.name(), resp.collection);
        let songs = tracks.into_iter().map(map_track).collect();
        Ok(normalize_songs(self.name(), songs))
    }

    /// 使用官方榜单作为热门列表。
    async fn trending(&self) -> Result<Vec<Song>> {
        let params = [
            ("kind", "top".to_string()),
            ("genre", CHART_GENRE.to_string()),
            ("limit", DEFAULT_LIMIT.to_string()),
        ];

        let resp: models::ChartCollection = self.get_json("/charts", &params).await?;
        let entries: Vec<models::ChartEntry> = decode_records(self.name(), resp.collection);
        let songs = entries
            .into_iter()
            .map(|entry| map_track(entry.track))
            .collect();
        Ok(normalize_songs(self.name(), songs))
    }
}

/// 把上游音轨映射为标准结构。
fn map_track(track: models::Track) -> Song {
    let (username, avatar) = track
        .user
        .map(|u| (u.username, u.avatar_url))
        .unwrap_or_default();

    let artwork = track
        .artwork_url
        .filter(|url| !url.is_empty())
        .or(avatar)
        .map(|url| artwork_variants(&url))
        .unwrap_or_default();

    Song {
        id: track.id.to_string(),
        name: track.title,
        primary_artists: username,
        image: artwork,
        download_url: vec![MediaLink::new("high", track.permalink_url.clone())],
        duration: track.duration / 1000,
        kind: ProviderKind::SoundCloud.to_string(),
        url: Some(track.permalink_url).filter(|u| !u.is_empty()),
    }
}

/// 把 `-large` 封面扩展为多个尺寸，按尺寸升序排列。
fn artwork_variants(url: &str) -> Vec<MediaLink> {
    if url.contains("-large.") {
        vec![
            MediaLink::new("100x100", url),
            MediaLink::new("300x300", url.replace("-large.", "-t300x300.")),
            MediaLink::new("500x500", url.replace("-large.", "-t500x500.")),
        ]
    } else {
        vec![MediaLink::new("high", url)]
    }
}
