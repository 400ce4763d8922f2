//! 提供商模块
//!
//! 该模块定义了与各音乐平台进行交互的核心抽象。

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::warn;

use crate::{
    error::{MusicBridgeError, Result},
    model::{SearchQuery, song::Song},
};

pub mod jiosaavn;
pub mod soundcloud;
pub mod youtube;

/// 所有受支持的提供商种类。
///
/// 字符串形式用于配置文件、日志以及响应中的 `source` 字段。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum ProviderKind {
    /// JioSaavn 镜像 API
    #[serde(rename = "jiosaavn")]
    #[strum(serialize = "jiosaavn")]
    JioSaavn,
    /// SoundCloud
    #[serde(rename = "soundcloud")]
    #[strum(serialize = "soundcloud")]
    SoundCloud,
    /// YouTube
    #[serde(rename = "youtube")]
    #[strum(serialize = "youtube")]
    YouTube,
    /// 偏向音乐内容的 YouTube 搜索
    #[serde(rename = "youtube-music")]
    #[strum(serialize = "youtube-music")]
    YouTubeMusic,
}

/// 定义了所有音乐平台提供商需要实现的通用接口。
///
/// 实现方负责把各自平台的原始响应映射为标准的 [`Song`]，
/// 并在返回前调用 [`crate::model::song::normalize_songs`] 完成校验。
/// 提供商内部不做重试，重试与回退由 [`crate::search::FallbackChain`] 负责。
#[async_trait]
pub trait Provider: Send + Sync {
    /// 返回提供商的种类。
    fn kind(&self) -> ProviderKind;

    ///
    /// 返回提供商的唯一名称。
    ///
    /// 一个全小写的静态字符串，例如 `"youtube"`, `"soundcloud"`。
    ///
    fn name(&self) -> &'static str {
        self.kind().into()
    }

    ///
    /// 根据关键词搜索歌曲。
    ///
    /// # 参数
    /// * `query` - 关键词以及可选的分页参数。
    ///
    /// # 返回
    /// 一个 `Result`，成功时包含已经过校验的 `Vec<Song>`。
    ///
    async fn search_songs(&self, query: &SearchQuery) -> Result<Vec<Song>>;

    /// 提供商是否具备调用所需的配置（例如凭据）。
    ///
    /// 未配置的提供商仍会出现在回退链中，调用时以 `Configuration` 错误失败。
    fn is_configured(&self) -> bool {
        true
    }

    /// 获取“热门”列表时使用的固定关键词。
    fn trending_query(&self) -> &'static str {
        "trending"
    }

    ///
    /// 获取热门歌曲。
    ///
    /// 默认实现只是用 `trending_query()` 做一次普通搜索。
    ///
    async fn trending(&self) -> Result<Vec<Song>> {
        self.search_songs(&SearchQuery::new(self.trending_query()).with_limit(20))
            .await
    }

    ///
    /// 根据歌曲 ID 获取单首歌曲的详细信息。
    ///
    /// # 参数
    /// * `song_id` - 特定于该提供商的歌曲 ID。
    ///
    async fn get_song_info(&self, song_id: &str) -> Result<Song> {
        let _ = song_id;
        Err(MusicBridgeError::ProviderNotSupported(format!(
            "{} 不支持 get_song_info",
            self.name()
        )))
    }
}

/// 逐条反序列化上游记录，无法解析的记录会被丢弃并记录日志，不影响其余记录。
pub(crate) fn decode_records<T: DeserializeOwned>(provider: &str, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("[{provider}] 丢弃了一条无法解析的上游记录: {e}");
                None
            }
        })
        .collect()
}
