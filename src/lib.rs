#![warn(missing_docs)]

//! # Music Bridge RS
//!
//! 一个轻量的音乐聚合代理，把多个音乐平台的搜索结果统一为同一种歌曲结构，
//! 并把 YouTube 视频转为可直接播放的音频流。
//!
//! ## 主要功能
//!
//! - **统一搜索**: 从 JioSaavn 镜像、SoundCloud 和 YouTube 搜索歌曲，输出统一的 [`Song`]。
//! - **自动回退**: 每个接口都配置一条提供商回退链，主提供商失败时自动尝试下一个。
//! - **音频转发**: 通过 `yt-dlp` 解析 YouTube 视频的最佳音频格式，并把字节流直接转发给客户端。
//! - **HTTP 服务**: [`server`] 模块提供了完整的 axum 路由。
//!
//! ## 搜索歌曲
//!
//! ```rust,no_run
//! use music_bridge_rs::{Endpoint, MusicBridge, config::AppConfig, model::SearchQuery};
//!
//! async {
//!     let config = AppConfig::default();
//!     let bridge = MusicBridge::from_config(&config).unwrap();
//!
//!     match bridge.search(Endpoint::Songs, &SearchQuery::new("Tum Hi Ho")).await {
//!         Ok(outcome) => println!("{} 返回了 {} 首歌曲。", outcome.source, outcome.songs.len()),
//!         Err(e) => eprintln!("搜索失败: {}", e),
//!     }
//! };
//! ```
pub mod config;
pub mod error;
pub mod model;
pub mod providers;
pub mod search;
pub mod server;
pub mod stream;

use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::Client;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use tracing::info;

pub use crate::{
    error::{MusicBridgeError, Result},
    model::song::Song,
    search::ChainOutcome,
};

use crate::{
    config::{AppConfig, ChainConfig},
    model::SearchQuery,
    providers::{
        Provider, ProviderKind,
        jiosaavn::JioSaavnClient,
        soundcloud::{SoundCloudClient, SoundCloudCredentials},
        youtube::{YouTubeFlavor, YouTubeProvider, backend::VideoBackend, ytdlp::YtDlp},
    },
    search::FallbackChain,
    stream::{AudioStream, StreamResolver},
};

/// 缺少搜索关键词时的提示。
pub const QUERY_REQUIRED: &str = "Query is required";
/// 缺少视频 ID 时的提示。
pub const ID_REQUIRED: &str = "ID is required";

// ==========================================================
//  顶层 API
// ==========================================================

/// 使用回退链的接口。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Endpoint {
    /// 通用歌曲搜索。
    #[strum(serialize = "songs")]
    Songs,
    /// 热门歌曲。
    #[strum(serialize = "trending")]
    Trending,
    /// SoundCloud 搜索。
    #[strum(serialize = "soundcloud")]
    SoundCloud,
    /// YouTube 搜索。
    #[strum(serialize = "youtube")]
    YouTube,
    /// 偏向音乐的 YouTube 搜索。
    #[strum(serialize = "youtube_music")]
    YouTubeMusic,
}

impl Endpoint {
    fn configured_chain(self, chains: &ChainConfig) -> &[ProviderKind] {
        match self {
            Endpoint::Songs => &chains.songs,
            Endpoint::Trending => &chains.trending,
            Endpoint::SoundCloud => &chains.soundcloud,
            Endpoint::YouTube => &chains.youtube,
            Endpoint::YouTubeMusic => &chains.youtube_music,
        }
    }
}

/// 顶层客户端，封装了所有提供商、回退链和音频流解析器。
///
/// 这是与本库交互的主要入口点。构造完成后所有状态都是只读的，
/// 可以放进 `Arc` 在请求之间共享。
pub struct MusicBridge {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
    chains: HashMap<Endpoint, FallbackChain>,
    resolver: StreamResolver,
}

impl MusicBridge {
    /// 根据配置创建所有提供商和回退链。
    ///
    /// 此方法不会发起任何网络请求。SoundCloud 凭据缺失不是错误，
    /// 只会让 SoundCloud 在回退链中失败并由后续提供商接手。
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let credentials = SoundCloudCredentials::from_option(config.soundcloud_client_id());
        if !credentials.is_configured() {
            info!("[SoundCloud] 未配置 SOUNDCLOUD_CLIENT_ID，相关请求将回退到其他提供商。");
        }

        let backend: Arc<dyn VideoBackend> =
            Arc::new(YtDlp::new(&config.ytdlp_path, config.ytdlp_timeout()));

        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(JioSaavnClient::new(
                &config.saavn_api_base,
                config.request_timeout(),
            )?),
            Arc::new(SoundCloudClient::new(
                &config.soundcloud_api_base,
                credentials,
                config.soundcloud_timeout(),
            )?),
            Arc::new(YouTubeProvider::new(
                backend.clone(),
                YouTubeFlavor::Standard,
            )),
            Arc::new(YouTubeProvider::new(backend.clone(), YouTubeFlavor::Music)),
        ];

        let stream_client = Client::builder()
            .connect_timeout(config.request_timeout())
            .build()?;
        let resolver = StreamResolver::new(backend, stream_client);

        Self::with_components(
            providers,
            &config.chains,
            resolver,
            config.provider_timeout(),
        )
    }

    /// 使用给定的组件创建实例，主要用于测试或嵌入自定义提供商。
    ///
    /// # 参数
    /// * `providers` - 所有可用的提供商，同一种类只保留最后一个。
    /// * `chains` - 各接口的回退链配置，链中的每个提供商都必须出现在 `providers` 中。
    /// * `resolver` - 音频流解析器。
    /// * `provider_timeout` - 回退链中单个提供商调用的总超时。
    pub fn with_components(
        providers: Vec<Arc<dyn Provider>>,
        chains: &ChainConfig,
        resolver: StreamResolver,
        provider_timeout: Duration,
    ) -> Result<Self> {
        chains.validate()?;

        let providers: HashMap<ProviderKind, Arc<dyn Provider>> =
            providers.into_iter().map(|p| (p.kind(), p)).collect();

        let mut built = HashMap::new();
        for endpoint in Endpoint::iter() {
            let members = endpoint
                .configured_chain(chains)
                .iter()
                .map(|kind| {
                    providers.get(kind).cloned().ok_or_else(|| {
                        MusicBridgeError::Configuration(format!(
                            "回退链 '{endpoint}' 引用了未注册的提供商 '{kind}'"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let chain = FallbackChain::new(members).with_timeout(provider_timeout);
            info!(
                "接口 '{endpoint}' 的回退链: {}",
                chain.provider_names().join(" → ")
            );
            built.insert(endpoint, chain);
        }

        Ok(Self {
            providers,
            chains: built,
            resolver,
        })
    }

    fn chain(&self, endpoint: Endpoint) -> Result<&FallbackChain> {
        self.chains.get(&endpoint).ok_or_else(|| {
            MusicBridgeError::Internal(format!("接口 '{endpoint}' 没有回退链"))
        })
    }

    /// 在指定接口的回退链上搜索歌曲。
    ///
    /// 空白关键词会在发起任何请求前以 `Validation` 错误拒绝。
    pub async fn search(&self, endpoint: Endpoint, query: &SearchQuery) -> Result<ChainOutcome> {
        if query.query.trim().is_empty() {
            return Err(MusicBridgeError::Validation(QUERY_REQUIRED.to_string()));
        }
        self.chain(endpoint)?.resolve(query).await
    }

    /// 在热门接口的回退链上获取热门歌曲。
    pub async fn trending(&self) -> Result<ChainOutcome> {
        self.chain(Endpoint::Trending)?.trending().await
    }

    /// 从 JioSaavn 获取单首歌曲的详细信息。
    pub async fn song_details(&self, song_id: &str) -> Result<Song> {
        let song_id = song_id.trim();
        if song_id.is_empty() {
            return Err(MusicBridgeError::Validation(ID_REQUIRED.to_string()));
        }

        let provider = self.providers.get(&ProviderKind::JioSaavn).ok_or_else(|| {
            MusicBridgeError::ProviderNotSupported(ProviderKind::JioSaavn.to_string())
        })?;
        provider.get_song_info(song_id).await
    }

    /// 打开一个 YouTube 视频的音频流。
    ///
    /// 返回时已经收到上游的首个数据块。
    pub async fn open_stream(&self, video_id: &str, range: Option<&str>) -> Result<AudioStream> {
        let video_id = video_id.trim();
        if video_id.is_empty() {
            return Err(MusicBridgeError::Validation(ID_REQUIRED.to_string()));
        }
        self.resolver.open_stream(video_id, range).await
    }

    /// SoundCloud 是否已配置凭据。
    pub fn soundcloud_configured(&self) -> bool {
        self.providers
            .get(&ProviderKind::SoundCloud)
            .is_some_and(|p| p.is_configured())
    }
}
