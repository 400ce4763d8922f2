//! 定义了 YouTube 数据来源的抽象。
//!
//! 搜索和格式解析都依赖第三方工具而非官方 API，
//! 这里用一个 trait 把它们隔离开，方便替换实现或在测试中注入。

use std::{collections::HashMap, sync::LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;

static VIDEO_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("静态正则表达式无效"));

/// 判断字符串是否是合法的 YouTube 视频 ID。
pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID_REGEX.is_match(id)
}

/// 一张缩略图。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thumbnail {
    /// 图片地址。
    pub url: String,
    /// 宽度（像素）。
    pub width: Option<u32>,
    /// 高度（像素）。
    pub height: Option<u32>,
}

/// 一条视频搜索结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoEntry {
    /// 视频 ID。
    pub id: String,
    /// 视频标题。
    pub title: String,
    /// 频道名称。
    pub channel: String,
    /// 时长（秒）。
    pub duration: u64,
    /// 缩略图列表。
    pub thumbnails: Vec<Thumbnail>,
}

/// 一个可下载的媒体格式。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFormat {
    /// 格式 ID。
    pub format_id: String,
    /// 媒体直链。
    pub url: String,
    /// 容器扩展名，例如 `"m4a"`、`"webm"`。
    pub ext: Option<String>,
    /// 音频编码，`"none"` 表示没有音轨。
    pub acodec: Option<String>,
    /// 视频编码，`"none"` 表示没有画面。
    pub vcodec: Option<String>,
    /// 平均音频码率 (kbps)。
    pub abr: Option<f64>,
    /// 文件大小（字节）。
    pub filesize: Option<u64>,
    /// 请求直链时需要携带的请求头。
    pub http_headers: HashMap<String, String>,
}

impl MediaFormat {
    /// 是否是纯音频格式：有音轨且没有画面。
    pub fn is_audio_only(&self) -> bool {
        let has_audio = self.acodec.as_deref().is_some_and(|c| c != "none");
        let has_video = self.vcodec.as_deref().is_some_and(|c| c != "none");
        has_audio && !has_video
    }

    /// 根据容器推断 MIME 类型。
    pub fn mime_type(&self) -> Option<&'static str> {
        match self.ext.as_deref()? {
            "m4a" | "mp4" => Some("audio/mp4"),
            "webm" => Some("audio/webm"),
            "mp3" => Some("audio/mpeg"),
            "ogg" | "opus" => Some("audio/ogg"),
            _ => None,
        }
    }
}

/// 从格式列表中选出最佳的纯音频格式。
///
/// 优先比较码率，其次比较文件大小。没有纯音频格式时返回 `None`。
pub fn select_best_audio(formats: &[MediaFormat]) -> Option<&MediaFormat> {
    formats
        .iter()
        .filter(|f| f.is_audio_only() && !f.url.is_empty())
        .max_by(|a, b| {
            let abr = a.abr.unwrap_or(0.0).total_cmp(&b.abr.unwrap_or(0.0));
            abr.then(a.filesize.unwrap_or(0).cmp(&b.filesize.unwrap_or(0)))
        })
}

/// YouTube 数据来源需要实现的接口。
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// 文本搜索，最多返回 `limit` 条结果。
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<VideoEntry>>;

    /// 解析视频的所有可用格式。
    async fn resolve_formats(&self, video_id: &str) -> Result<Vec<MediaFormat>>;
}
