//! 基于 `yt-dlp` 可执行文件的 `VideoBackend` 实现。

use std::{collections::HashMap, path::PathBuf, process::Stdio, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    error::{MusicBridgeError, Result},
    providers::youtube::backend::{
        MediaFormat, Thumbnail, VideoBackend, VideoEntry, is_valid_video_id,
    },
};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// `yt-dlp` 报告视频不可用时 stderr 中会出现的片段。
const UNAVAILABLE_MARKERS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video has been removed",
    "Incomplete YouTube ID",
    "not a valid URL",
];

/// `--flat-playlist --dump-json` 输出的单行搜索结果。
#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: String,
    #[serde(default)]
    title: String,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    ie_key: Option<String>,
    #[serde(default)]
    thumbnails: Vec<RawThumbnail>,
}

#[derive(Debug, Deserialize)]
struct RawThumbnail {
    url: String,
    width: Option<u32>,
    height: Option<u32>,
}

/// `--dump-single-json` 输出中我们关心的部分。
#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    url: Option<String>,
    ext: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    abr: Option<f64>,
    filesize: Option<u64>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
}

/// 通过子进程调用 `yt-dlp` 完成搜索和格式解析。
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    timeout: Duration,
}

impl YtDlp {
    /// 创建一个新的 `YtDlp` 实例。
    ///
    /// # 参数
    /// * `binary` - `yt-dlp` 可执行文件路径。
    /// * `timeout` - 单次调用的超时，超时后子进程会被终止。
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// 运行 `yt-dlp` 并返回标准输出。
    ///
    /// 子进程设置了 `kill_on_drop`，无论超时还是调用方被取消都不会留下孤儿进程。
    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!("[yt-dlp] 执行: {} {}", self.binary.display(), args.join(" "));

        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| MusicBridgeError::Timeout {
                provider: "yt-dlp",
                secs: self.timeout.as_secs(),
            })??;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stderr
            .lines()
            .rev()
            .find(|l| l.contains("ERROR"))
            .unwrap_or_else(|| stderr.trim())
            .to_string();
        Err(MusicBridgeError::ApiError(format!(
            "yt-dlp (exit {}): {message}",
            output.status.code().unwrap_or(-1)
        )))
    }
}

#[async_trait]
impl VideoBackend for YtDlp {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<VideoEntry>> {
        let target = format!("ytsearch{limit}:{query}");
        let stdout = self
            .run(&[
                "--flat-playlist",
                "--dump-json",
                "--no-warnings",
                "--ignore-config",
                &target,
            ])
            .await?;

        Ok(parse_search_output(&stdout))
    }

    async fn resolve_formats(&self, video_id: &str) -> Result<Vec<MediaFormat>> {
        if !is_valid_video_id(video_id) {
            return Err(MusicBridgeError::VideoNotFound(video_id.to_string()));
        }

        let url = format!("{WATCH_URL}{video_id}");
        let stdout = match self
            .run(&[
                "--dump-single-json",
                "--no-playlist",
                "--no-warnings",
                "--ignore-config",
                &url,
            ])
            .await
        {
            Ok(stdout) => stdout,
            Err(MusicBridgeError::ApiError(msg))
                if UNAVAILABLE_MARKERS.iter().any(|m| msg.contains(m)) =>
            {
                warn!("[yt-dlp] 视频 {video_id} 不可用: {msg}");
                return Err(MusicBridgeError::VideoNotFound(video_id.to_string()));
            }
            Err(e) => return Err(e),
        };

        let info: VideoInfo = serde_json::from_str(&stdout)?;
        Ok(info.formats.into_iter().filter_map(map_format).collect())
    }
}

/// 解析逐行输出的搜索结果，忽略无法解析的行和非视频条目（频道、播放列表）。
fn parse_search_output(stdout: &str) -> Vec<VideoEntry> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<FlatEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("[yt-dlp] 搜索输出中有无法解析的行，已忽略。错误: {e}");
                None
            }
        })
        .filter(|entry| entry.ie_key.as_deref().is_none_or(|k| k == "Youtube"))
        .map(|entry| VideoEntry {
            id: entry.id,
            title: entry.title,
            channel: entry.channel.or(entry.uploader).unwrap_or_default(),
            duration: entry.duration.map_or(0, |d| d.max(0.0) as u64),
            thumbnails: entry
                .thumbnails
                .into_iter()
                .map(|t| Thumbnail {
                    url: t.url,
                    width: t.width,
                    height: t.height,
                })
                .collect(),
        })
        .collect()
}

fn map_format(raw: RawFormat) -> Option<MediaFormat> {
    Some(MediaFormat {
        format_id: raw.format_id,
        url: raw.url?,
        ext: raw.ext,
        acodec: raw.acodec,
        vcodec: raw.vcodec,
        abr: raw.abr,
        filesize: raw.filesize,
        http_headers: raw.http_headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_output() {
        let stdout = concat!(
            r#"{"id": "dQw4w9WgXcQ", "title": "Never Gonna Give You Up", "channel": "Rick Astley", "duration": 213.0, "ie_key": "Youtube", "thumbnails": [{"url": "https://i.ytimg.com/a.jpg", "width": 168, "height": 94}, {"url": "https://i.ytimg.com/b.jpg", "width": 336, "height": 188}]}"#,
            "\n",
            "not json\n",
            r#"{"id": "UCuAXFkgsw1L7xaCfnd5JJOw", "title": "Rick Astley", "ie_key": "YoutubeTab"}"#,
            "\n",
            r#"{"id": "abcdefghijk", "title": "Live", "uploader": "Someone", "duration": null}"#,
            "\n",
        );

        let entries = parse_search_output(stdout);
        assert_eq!(entries.len(), 2, "频道条目和损坏的行应被忽略");

        assert_eq!(entries[0].id, "dQw4w9WgXcQ");
        assert_eq!(entries[0].channel, "Rick Astley");
        assert_eq!(entries[0].duration, 213);
        assert_eq!(entries[0].thumbnails.len(), 2);

        assert_eq!(entries[1].channel, "Someone");
        assert_eq!(entries[1].duration, 0);
    }

    #[test]
    fn test_formats_without_url_are_skipped() {
        let json = r#"{"formats": [
            {"format_id": "sb0", "ext": "mhtml", "acodec": "none", "vcodec": "none"},
            {"format_id": "140", "url": "https://rr.googlevideo.com/140", "ext": "m4a", "acodec": "mp4a.40.2", "vcodec": "none", "abr": 129.5, "http_headers": {"User-Agent": "Mozilla/5.0"}}
        ]}"#;

        let info: VideoInfo = serde_json::from_str(json).unwrap();
        let formats: Vec<_> = info.formats.into_iter().filter_map(map_format).collect();

        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].format_id, "140");
        assert!(formats[0].is_audio_only());
        assert_eq!(formats[0].mime_type(), Some("audio/mp4"));
        assert_eq!(
            formats[0].http_headers.get("User-Agent").map(String::as_str),
            Some("Mozilla/5.0")
        );
    }

    #[tokio::test]
    async fn test_invalid_video_id_is_rejected_before_spawning() {
        let backend = YtDlp::new("/nonexistent/yt-dlp", Duration::from_secs(1));
        let err = backend.resolve_formats("--exec=id").await.unwrap_err();
        assert!(matches!(err, MusicBridgeError::VideoNotFound(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_search() {
        let backend = YtDlp::new("yt-dlp", Duration::from_secs(30));
        let entries = backend.search("lofi hip hop", 5).await.unwrap();
        assert!(!entries.is_empty());
        println!("搜索结果: {entries:#?}");
    }
}
