//! 此模块实现了基于 YouTube 的 `Provider`。
//!
//! 搜索结果中的可播放链接并不是 YouTube 的直链，而是指回本服务的
//! `/api/youtube/stream` 路径，由 [`crate::stream::StreamResolver`] 在播放时解析。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    error::Result,
    model::{
        SearchQuery,
        song::{MediaLink, Song, normalize_songs},
    },
    providers::{Provider, ProviderKind},
};

pub mod backend;
pub mod ytdlp;

use backend::{VideoBackend, VideoEntry};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 25;

/// 流式播放接口的路径。
pub const STREAM_PATH: &str = "/api/youtube/stream";

/// YouTube 搜索的风格。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YouTubeFlavor {
    /// 原样搜索。
    Standard,
    /// 在关键词后追加 `music`，使结果偏向音乐内容。
    Music,
}

/// YouTube 提供商。
pub struct YouTubeProvider {
    backend: Arc<dyn VideoBackend>,
    flavor: YouTubeFlavor,
}

impl YouTubeProvider {
    /// 创建一个新的 `YouTubeProvider` 实例。
    pub fn new(backend: Arc<dyn VideoBackend>, flavor: YouTubeFlavor) -> Self {
        Self { backend, flavor }
    }

    fn effective_query(&self, query: &str) -> String {
        match self.flavor {
            YouTubeFlavor::Standard => query.to_string(),
            YouTubeFlavor::Music => music_biased_query(query),
        }
    }

    fn map_entry(&self, entry: VideoEntry) -> Song {
        let image = entry
            .thumbnails
            .into_iter()
            .map(|t| match (t.width, t.height) {
                (Some(w), Some(h)) => MediaLink::new(format!("{w}x{h}"), t.url),
                _ => MediaLink::new("high", t.url),
            })
            .collect();

        Song {
            download_url: vec![MediaLink::new("high", stream_link(&entry.id))],
            id: entry.id,
            name: entry.title,
            primary_artists: entry.channel,
            image,
            duration: entry.duration,
            kind: self.kind().to_string(),
            url: None,
        }
    }
}

#[async_trait]
impl Provider for YouTubeProvider {
    fn kind(&self) -> ProviderKind {
        match self.flavor {
            YouTubeFlavor::Standard => ProviderKind::YouTube,
            YouTubeFlavor::Music => ProviderKind::YouTubeMusic,
        }
    }

    async fn search_songs(&self, query: &SearchQuery) -> Result<Vec<Song>> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let effective = self.effective_query(&query.query);

        let entries = self.backend.search(&effective, limit).await?;
        info!(
            "[YouTube] 搜索 '{effective}' 返回 {} 条结果 ({})。",
            entries.len(),
            self.name()
        );

        let songs = entries
            .into_iter()
            .take(limit as usize)
            .map(|e| self.map_entry(e))
            .collect();
        Ok(normalize_songs(self.name(), songs))
    }

    fn trending_query(&self) -> &'static str {
        "trending music"
    }
}

/// 除非关键词已经包含 `music`（不区分大小写），否则在末尾追加 ` music`。
pub fn music_biased_query(query: &str) -> String {
    if query.to_lowercase().contains("music") {
        query.to_string()
    } else {
        format!("{query} music")
    }
}

/// 构造指回本服务流式接口的相对链接。
pub fn stream_link(video_id: &str) -> String {
    format!("{STREAM_PATH}?id={}", urlencoding::encode(video_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        error::MusicBridgeError,
        providers::youtube::backend::{MediaFormat, Thumbnail},
    };

    /// 记录收到的查询并返回固定结果的后端。
    #[derive(Default)]
    struct RecordingBackend {
        queries: Mutex<Vec<(String, u32)>>,
        entries: Vec<VideoEntry>,
    }

    #[async_trait]
    impl VideoBackend for RecordingBackend {
        async fn search(&self, query: &str, limit: u32) -> Result<Vec<VideoEntry>> {
            self.queries
                .lock()
                .unwrap()
                .push((query.to_string(), limit));
            Ok(self.entries.clone())
        }

        async fn resolve_formats(&self, video_id: &str) -> Result<Vec<MediaFormat>> {
            Err(MusicBridgeError::VideoNotFound(video_id.to_string()))
        }
    }

    fn entry(id: &str) -> VideoEntry {
        VideoEntry {
            id: id.to_string(),
            title: "Lofi Beats".to_string(),
            channel: "Lofi Girl".to_string(),
            duration: 125,
            thumbnails: vec![
                Thumbnail {
                    url: "https://i.ytimg.com/hq.jpg".to_string(),
                    width: Some(480),
                    height: Some(360),
                },
                Thumbnail {
                    url: "https://i.ytimg.com/default.jpg".to_string(),
                    width: Some(120),
                    height: Some(90),
                },
            ],
        }
    }

    #[test]
    fn test_music_biased_query() {
        assert_eq!(music_biased_query("lofi"), "lofi music");
        assert_eq!(music_biased_query("music beats"), "music beats");
        assert_eq!(music_biased_query("Chill MUSIC"), "Chill MUSIC");
    }

    #[test]
    fn test_stream_link_is_url_encoded() {
        assert_eq!(
            stream_link("dQw4w9WgXcQ"),
            "/api/youtube/stream?id=dQw4w9WgXcQ"
        );
        assert_eq!(stream_link("a b&c"), "/api/youtube/stream?id=a%20b%26c");
    }

    #[tokio::test]
    async fn test_search_maps_entries() {
        let backend = Arc::new(RecordingBackend {
            entries: vec![entry("dQw4w9WgXcQ")],
            ..Default::default()
        });
        let provider = YouTubeProvider::new(backend.clone(), YouTubeFlavor::Standard);

        let songs = provider
            .search_songs(&SearchQuery::new("lofi"))
            .await
            .unwrap();

        assert_eq!(songs.len(), 1);
        let song = &songs[0];
        assert_eq!(song.duration, 125, "时长不应做任何换算");
        assert_eq!(song.kind, "youtube");
        assert_eq!(song.primary_artists, "Lofi Girl");
        assert_eq!(
            song.best_download(),
            Some("/api/youtube/stream?id=dQw4w9WgXcQ")
        );
        assert_eq!(song.best_image(), "https://i.ytimg.com/hq.jpg");

        let queries = backend.queries.lock().unwrap();
        assert_eq!(queries.as_slice(), &[("lofi".to_string(), DEFAULT_LIMIT)]);
    }

    #[tokio::test]
    async fn test_music_flavor_biases_query_and_tags_songs() {
        let backend = Arc::new(RecordingBackend {
            entries: vec![entry("abcdefghijk")],
            ..Default::default()
        });
        let provider = YouTubeProvider::new(backend.clone(), YouTubeFlavor::Music);
        assert_eq!(provider.name(), "youtube-music");

        let songs = provider
            .search_songs(&SearchQuery::new("lofi").with_limit(100))
            .await
            .unwrap();
        assert_eq!(songs[0].kind, "youtube-music");

        provider
            .search_songs(&SearchQuery::new("music beats"))
            .await
            .unwrap();

        let queries = backend.queries.lock().unwrap();
        assert_eq!(
            queries.as_slice(),
            &[
                ("lofi music".to_string(), MAX_LIMIT),
                ("music beats".to_string(), DEFAULT_LIMIT),
            ]
        );
    }

    #[tokio::test]
    async fn test_trending_uses_music_query() {
        let backend = Arc::new(RecordingBackend::default());
        let provider = YouTubeProvider::new(backend.clone(), YouTubeFlavor::Standard);

        let songs = provider.trending().await.unwrap();
        assert!(songs.is_empty());

        let queries = backend.queries.lock().unwrap();
        assert_eq!(queries[0].0, "trending music");
    }
}
