//! 定义了所有提供商共享的标准歌曲结构 `Song`，以及进入该结构前的校验与修补逻辑。
//!
//! `image` 和 `downloadUrl` 两个列表遵循同一约定：按音质/尺寸**升序**排列，
//! 最后一个元素即为最高质量。播放端直接取末尾元素，
//! 因此任何打乱顺序的适配器都会悄无声息地降低封面和播放质量。

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// 上游缺少封面时使用的占位图。
pub const FALLBACK_IMAGE_URL: &str = "https://picsum.photos/500/500?grayscale";

/// 上游缺少艺术家信息时使用的显示名。
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

static DIMENSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*x\s*(\d+)$").expect("静态正则表达式无效"));
static BITRATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(?:kbps|k)?$").expect("静态正则表达式无效"));

/// 一个带有质量标签的媒体链接（封面或音频）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaLink {
    /// 质量标签，例如 `"500x500"`、`"320kbps"` 或 `"high"`。
    pub quality: String,
    /// 资源地址，可以是绝对 URL，也可以是指回本服务的相对路径。
    pub link: String,
}

impl MediaLink {
    /// 创建一个新的媒体链接。
    pub fn new(quality: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            quality: quality.into(),
            link: link.into(),
        }
    }

    /// 将质量标签换算为可比较的等级。
    ///
    /// 无法识别的标签返回 0。
    pub fn quality_rank(&self) -> u64 {
        quality_rank(&self.quality)
    }
}

/// 将质量标签换算为可比较的等级。
///
/// * `"500x500"` → 像素面积
/// * `"320kbps"` / `"320"` → 码率数值
/// * `"low"` / `"medium"` / `"high"` 等 → 1 / 2 / 3
pub fn quality_rank(label: &str) -> u64 {
    let label = label.trim().to_lowercase();

    if let Some(caps) = DIMENSION_REGEX.captures(&label) {
        let w: u64 = caps[1].parse().unwrap_or(0);
        let h: u64 = caps[2].parse().unwrap_or(0);
        return w.saturating_mul(h);
    }

    if let Some(caps) = BITRATE_REGEX.captures(&label) {
        return caps[1].parse().unwrap_or(0);
    }

    match label.as_str() {
        "low" | "small" | "thumbnail" | "default" => 1,
        "medium" | "mid" | "standard" => 2,
        "high" | "large" | "best" | "maxres" | "original" => 3,
        _ => 0,
    }
}

/// 所有提供商输出的标准歌曲记录。
///
/// 这是一个只在单次请求中存在的传输对象，服务端不做任何持久化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// 在提供商内部唯一的 ID，跨提供商不保证唯一。
    pub id: String,
    /// 歌曲标题。
    pub name: String,
    /// 演唱者，多个艺术家以逗号连接。
    pub primary_artists: String,
    /// 封面列表，按质量升序排列。
    pub image: Vec<MediaLink>,
    /// 可播放资源列表，按质量升序排列。
    pub download_url: Vec<MediaLink>,
    /// 时长（秒）。
    pub duration: u64,
    /// 来源标签，例如 `"youtube"`、`"soundcloud"`。
    #[serde(rename = "type")]
    pub kind: String,
    /// 提供商页面链接。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// 一条上游记录无法满足标准结构时的原因。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// 缺少 ID
    #[error("缺少 id")]
    MissingId,
    /// 缺少标题
    #[error("缺少标题 (id: {0})")]
    MissingName(String),
    /// 没有任何可播放链接
    #[error("没有可播放链接 (id: {0})")]
    MissingDownload(String),
}

impl Song {
    /// 校验并修补一条记录，使其满足标准结构的约定。
    ///
    /// 缺少 ID、标题或可播放链接的记录会被拒绝；缺少封面或艺术家的记录会被修补。
    /// 通过校验的记录，其 `image` 与 `download_url` 均已按质量升序排列。
    pub fn normalize(mut self) -> Result<Self, SchemaViolation> {
        self.id = self.id.trim().to_string();
        if self.id.is_empty() {
            return Err(SchemaViolation::MissingId);
        }

        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(SchemaViolation::MissingName(self.id));
        }

        self.download_url.retain(|l| !l.link.trim().is_empty());
        if self.download_url.is_empty() {
            return Err(SchemaViolation::MissingDownload(self.id));
        }

        self.image.retain(|l| !l.link.trim().is_empty());
        if self.image.is_empty() {
            self.image.push(MediaLink::new("500x500", FALLBACK_IMAGE_URL));
        }

        if self.primary_artists.trim().is_empty() {
            self.primary_artists = UNKNOWN_ARTIST.to_string();
        }

        sort_by_quality(&mut self.image);
        sort_by_quality(&mut self.download_url);

        Ok(self)
    }

    /// 返回最高质量的封面链接，没有封面时返回占位图。
    pub fn best_image(&self) -> &str {
        self.image
            .last()
            .map_or(FALLBACK_IMAGE_URL, |l| l.link.as_str())
    }

    /// 返回最高质量的可播放链接。
    pub fn best_download(&self) -> Option<&str> {
        self.download_url.last().map(|l| l.link.as_str())
    }
}

/// 按质量等级稳定升序排序，无法识别的标签排在最前并保持原有相对顺序。
fn sort_by_quality(links: &mut [MediaLink]) {
    links.sort_by_key(MediaLink::quality_rank);
}

/// 对一个提供商的映射结果做批量校验，丢弃不合格的记录并记录日志。
pub fn normalize_songs(provider: &str, songs: Vec<Song>) -> Vec<Song> {
    songs
        .into_iter()
        .filter_map(|song| match song.normalize() {
            Ok(song) => Some(song),
            Err(violation) => {
                warn!("[{provider}] 丢弃了一条不合格的上游记录: {violation}");
                None
            }
        })
        .collect()
}

/// 将秒数格式化为 `m:ss`。
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_song() -> Song {
        Song {
            id: "abc".to_string(),
            name: "Song A".to_string(),
            primary_artists: "Artist A".to_string(),
            image: vec![
                MediaLink::new("500x500", "https://img/500"),
                MediaLink::new("50x50", "https://img/50"),
                MediaLink::new("150x150", "https://img/150"),
            ],
            download_url: vec![
                MediaLink::new("320kbps", "https://dl/320"),
                MediaLink::new("12kbps", "https://dl/12"),
                MediaLink::new("96kbps", "https://dl/96"),
            ],
            duration: 245,
            kind: "song".to_string(),
            url: None,
        }
    }

    #[test]
    fn test_normalize_sorts_links_ascending() {
        let song = sample_song().normalize().unwrap();

        let images: Vec<_> = song.image.iter().map(|l| l.quality.as_str()).collect();
        assert_eq!(images, vec!["50x50", "150x150", "500x500"]);

        let downloads: Vec<_> = song
            .download_url
            .iter()
            .map(|l| l.quality.as_str())
            .collect();
        assert_eq!(downloads, vec!["12kbps", "96kbps", "320kbps"]);

        assert_eq!(song.best_image(), "https://img/500");
        assert_eq!(song.best_download(), Some("https://dl/320"));
    }

    #[test]
    fn test_normalize_patches_missing_image_and_artist() {
        let mut song = sample_song();
        song.image = vec![MediaLink::new("high", "")];
        song.primary_artists = "  ".to_string();

        let song = song.normalize().unwrap();
        assert_eq!(song.image.len(), 1);
        assert_eq!(song.best_image(), FALLBACK_IMAGE_URL);
        assert_eq!(song.primary_artists, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_normalize_rejects_incomplete_records() {
        let mut no_id = sample_song();
        no_id.id = " ".to_string();
        assert_eq!(no_id.normalize(), Err(SchemaViolation::MissingId));

        let mut no_name = sample_song();
        no_name.name = String::new();
        assert_eq!(
            no_name.normalize(),
            Err(SchemaViolation::MissingName("abc".to_string()))
        );

        let mut no_download = sample_song();
        no_download.download_url = vec![MediaLink::new("high", "")];
        assert_eq!(
            no_download.normalize(),
            Err(SchemaViolation::MissingDownload("abc".to_string()))
        );
    }

    #[test]
    fn test_normalize_songs_drops_only_bad_records() {
        let mut bad = sample_song();
        bad.name = String::new();
        let songs = normalize_songs("test", vec![sample_song(), bad]);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, "abc");
    }

    #[test]
    fn test_quality_rank() {
        assert_eq!(quality_rank("500x500"), 250_000);
        assert_eq!(quality_rank("320kbps"), 320);
        assert_eq!(quality_rank("160"), 160);
        assert_eq!(quality_rank("HIGH"), 3);
        assert!(quality_rank("low") < quality_rank("medium"));
        assert_eq!(quality_rank("whatever"), 0);
    }

    #[test]
    fn test_unranked_labels_keep_their_order() {
        let mut links = vec![
            MediaLink::new("foo", "a"),
            MediaLink::new("bar", "b"),
            MediaLink::new("baz", "c"),
        ];
        sort_by_quality(&mut links);
        let order: Vec<_> = links.iter().map(|l| l.link.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(125), "2:05");
        assert_eq!(format_duration(3600), "60:00");
    }

    #[test]
    fn test_song_wire_shape() {
        let song = Song {
            id: "dQw4w9WgXcQ".to_string(),
            name: "Never Gonna Give You Up".to_string(),
            primary_artists: "Rick Astley".to_string(),
            image: vec![MediaLink::new("high", "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg")],
            download_url: vec![MediaLink::new(
                "high",
                "/api/youtube/stream?id=dQw4w9WgXcQ",
            )],
            duration: 213,
            kind: "youtube".to_string(),
            url: None,
        };

        insta::assert_snapshot!(serde_json::to_string_pretty(&song).unwrap(), @r#"
        {
          "id": "dQw4w9WgXcQ",
          "name": "Never Gonna Give You Up",
          "primaryArtists": "Rick Astley",
          "image": [
            {
              "quality": "high",
              "link": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg"
            }
          ],
          "downloadUrl": [
            {
              "quality": "high",
              "link": "/api/youtube/stream?id=dQw4w9WgXcQ"
            }
          ],
          "duration": 213,
          "type": "youtube"
        }
        "#);
    }
}
