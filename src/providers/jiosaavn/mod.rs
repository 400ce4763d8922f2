//! 此模块实现了与 JioSaavn 镜像 API 进行交互的 `Provider`。
//! API 来源于 <https://saavn.me>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{MusicBridgeError, Result},
    model::{
        SearchQuery,
        song::{MediaLink, Song, format_duration, normalize_songs},
    },
    providers::{Provider, ProviderKind, decode_records},
};

pub mod models;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 20;

/// JioSaavn 镜像 API 的客户端实现。
#[derive(Debug, Clone)]
pub struct JioSaavnClient {
    base_url: String,
    http_client: Client,
}

impl JioSaavnClient {
    /// 创建一个新的 `JioSaavnClient` 实例。
    ///
    /// # 参数
    /// * `base_url` - 镜像 API 的根地址，例如 `https://saavn.me/api`。
    /// * `timeout` - 单次请求的超时。
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// 发送 GET 请求并解析 `{status, data}` 外壳。
    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self.http_client.get(&url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MusicBridgeError::ApiError(format!(
                "JioSaavn {path} (HTTP {status})"
            )));
        }

        let text = response.text().await?;
        let body: models::ApiResponse<T> = serde_json::from_str(&text)?;
        if let Some(api_status) = body.status.as_deref()
            && !api_status.eq_ignore_ascii_case("success")
        {
            return Err(MusicBridgeError::ApiError(format!(
                "JioSaavn {path}: {}",
                body.message.as_deref().unwrap_or(api_status)
            )));
        }

        body.data
            .ok_or_else(|| MusicBridgeError::ApiError(format!("JioSaavn {path}: 缺少 data 字段")))
    }
}

#[async_trait]
impl Provider for JioSaavnClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::JioSaavn
    }

    async fn search_songs(&self, query: &SearchQuery) -> Result<Vec<Song>> {
        let params = [
            ("query", query.query.clone()),
            ("page", query.page.unwrap_or(DEFAULT_PAGE).to_string()),
            ("limit", query.limit.unwrap_or(DEFAULT_LIMIT).to_string()),
        ];

        let data: models::SearchData = self.get_data("/search/songs", &params).await?;
        info!(
            "[JioSaavn] 搜索 '{}' 返回 {} 条结果 (总计 {:?})。",
            query.query,
            data.results.len(),
            data.total
        );

        let records: Vec<models::SaavnSong> = decode_records(self.name(), data.results);
        let songs = records.into_iter().map(map_song).collect();
        Ok(normalize_songs(self.name(), songs))
    }

    async fn get_song_info(&self, song_id: &str) -> Result<Song> {
        let data: Vec<Value> = self
            .get_data("/songs", &[("id", song_id.to_string())])
            .await?;

        let records: Vec<models::SaavnSong> = decode_records(self.name(), data);
        let song = normalize_songs(self.name(), records.into_iter().map(map_song).collect())
            .into_iter()
            .next()
            .ok_or_else(|| MusicBridgeError::ApiError(format!("JioSaavn 歌曲 {song_id}")))?;

        debug!(
            "[JioSaavn] 获取到歌曲 '{}' ({})。",
            song.name,
            format_duration(song.duration)
        );
        Ok(song)
    }
}

/// 把上游的歌曲记录映射为标准结构。
fn map_song(song: models::SaavnSong) -> Song {
    let primary_artists = song
        .primary_artists
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            song.artists.map(|a| {
                a.primary
                    .into_iter()
                    .map(|artist| artist.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        })
        .unwrap_or_default();

    Song {
        id: song.id,
        name: song.name,
        primary_artists,
        image: map_links(song.image),
        download_url: map_links(song.download_url),
        duration: song.duration,
        kind: song.kind.unwrap_or_else(|| ProviderKind::JioSaavn.to_string()),
        url: song.url,
    }
}

fn map_links(links: Vec<models::SaavnLink>) -> Vec<MediaLink> {
    links
        .iter()
        .filter_map(|l| l.href().map(|href| MediaLink::new(l.quality.clone(), href)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_legacy_song() {
        let json = r#"{
            "id": "5WXAlMNt",
            "name": "Tum Hi Ho",
            "type": "song",
            "duration": "262",
            "primaryArtists": "Arijit Singh",
            "image": [
                {"quality": "500x500", "link": "https://c.saavncdn.com/500x500.jpg"},
                {"quality": "50x50", "link": "https://c.saavncdn.com/50x50.jpg"}
            ],
            "downloadUrl": [
                {"quality": "320kbps", "link": "https://aac.saavncdn.com/320.mp4"},
                {"quality": "12kbps", "link": "https://aac.saavncdn.com/12.mp4"}
            ],
            "url": "https://www.jiosaavn.com/song/tum-hi-ho/5WXAlMNt"
        }"#;

        let raw: models::SaavnSong = serde_json::from_str(json).unwrap();
        let song = map_song(raw).normalize().unwrap();

        assert_eq!(song.duration, 262);
        assert_eq!(song.primary_artists, "Arijit Singh");
        assert_eq!(song.kind, "song");
        assert_eq!(song.best_image(), "https://c.saavncdn.com/500x500.jpg");
        assert_eq!(
            song.best_download(),
            Some("https://aac.saavncdn.com/320.mp4")
        );
    }

    #[test]
    fn test_map_modern_song() {
        let json = r#"{
            "id": "abc",
            "name": "Kesariya",
            "duration": 268,
            "artists": {"primary": [{"name": "Pritam"}, {"name": "Arijit Singh"}]},
            "image": [{"quality": "150x150", "url": "https://c.saavncdn.com/150.jpg"}],
            "downloadUrl": [{"quality": "160kbps", "url": "https://aac.saavncdn.com/160.mp4"}]
        }"#;

        let raw: models::SaavnSong = serde_json::from_str(json).unwrap();
        let song = map_song(raw).normalize().unwrap();

        assert_eq!(song.duration, 268);
        assert_eq!(song.primary_artists, "Pritam, Arijit Singh");
        assert_eq!(song.kind, "jiosaavn");
        assert_eq!(song.image[0].link, "https://c.saavncdn.com/150.jpg");
        assert_eq!(song.url, None);
    }

    #[test]
    fn test_map_song_with_null_duration() {
        let json = r#"{"id": "x", "name": "Y", "duration": null, "downloadUrl": []}"#;
        let raw: models::SaavnSong = serde_json::from_str(json).unwrap();
        let song = map_song(raw);
        assert_eq!(song.duration, 0);
        assert!(song.normalize().is_err(), "没有下载链接的记录应被拒绝");
    }

    #[test]
    fn test_download_url_false_is_treated_as_empty() {
        let json = r#"{"id": "b", "name": "NoDl", "image": false, "downloadUrl": false}"#;
        let raw: models::SaavnSong = serde_json::from_str(json).unwrap();
        assert!(raw.download_url.is_empty());
        assert!(raw.image.is_empty());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_song_details_logs_formatted_duration() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/songs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "SUCCESS",
                "data": [{
                    "id": "5WXAlMNt",
                    "name": "Tum Hi Ho",
                    "duration": "262",
                    "downloadUrl": [{"quality": "320kbps", "link": "https://aac.saavncdn.com/320.mp4"}]
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = JioSaavnClient::new(mock_server.uri(), Duration::from_secs(5)).unwrap();
        let song = client.get_song_info("5WXAlMNt").await.unwrap();

        assert_eq!(song.duration, 262);
        assert!(logs_contain("'Tum Hi Ho' (4:22)"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let client = JioSaavnClient::new(mock_server.uri(), Duration::from_secs(5)).unwrap();
        let err = client
            .search_songs(&SearchQuery::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, MusicBridgeError::JsonParse(_)));
    }
}
