//! 此模块定义了所有用于反序列化 SoundCloud v2 API 响应的 `struct` 数据结构。

use serde::Deserialize;
use serde_json::Value;

/// `/search/tracks` 接口的顶层响应。
#[derive(Debug, Deserialize)]
pub struct TrackCollection {
    /// 匹配到的音轨列表，逐条解析为 [`Track`]。
    #[serde(default)]
    pub collection: Vec<Value>,
}

/// `/charts` 接口的顶层响应。
#[derive(Debug, Deserialize)]
pub struct ChartCollection {
    /// 榜单条目列表，逐条解析为 [`ChartEntry`]。
    #[serde(default)]
    pub collection: Vec<Value>,
}

/// 单个榜单条目。
#[derive(Debug, Deserialize)]
pub struct ChartEntry {
    /// 条目对应的音轨。
    pub track: Track,
}

/// 代表一条 SoundCloud 音轨。
#[derive(Debug, Deserialize)]
pub struct Track {
    /// 音轨的数字 ID。
    pub id: u64,
    /// 标题。
    #[serde(default)]
    pub title: String,
    /// 时长，单位为毫秒 (ms)。
    #[serde(default)]
    pub duration: u64,
    /// 封面地址，缺失时应退回上传者头像。
    pub artwork_url: Option<String>,
    /// 音轨页面地址。
    #[serde(default)]
    pub permalink_url: String,
    /// 上传者信息。
    pub user: Option<User>,
}

/// 上传者信息。
#[derive(Debug, Deserialize)]
pub struct User {
    /// 用户名。
    #[serde(default)]
    pub username: String,
    /// 头像地址。
    pub avatar_url: Option<String>,
}
