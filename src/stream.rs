//! 把 YouTube 视频 ID 解析为可直接转发给客户端的音频字节流。

use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{Stream, StreamExt, stream::BoxStream};
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT_RANGES, CONTENT_RANGE, RANGE},
};
use tracing::{debug, info, warn};

use crate::{
    error::{MusicBridgeError, Result},
    providers::youtube::backend::{VideoBackend, select_best_audio},
};

/// 无法从格式推断 MIME 类型时使用的默认值。
pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

/// 一个已经建立、且已收到首个数据块的音频流。
pub struct AudioStream {
    /// 200，或上游响应 206 时为 206。
    pub status: StatusCode,
    /// 音频 MIME 类型。
    pub content_type: &'static str,
    /// 上游给出的内容长度。
    pub content_length: Option<u64>,
    /// 上游给出的 `Content-Range`，仅在范围请求时存在。
    pub content_range: Option<String>,
    /// 上游是否支持范围请求：声明了 `Accept-Ranges: bytes`，或以 206 响应。
    pub accept_ranges: bool,
    /// 响应体。
    pub body: RelayStream,
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .field("accept_ranges", &self.accept_ranges)
            .finish_non_exhaustive()
    }
}

/// 从上游到客户端的透传字节流。
///
/// 持有上游响应的所有权，被丢弃时（正常结束、客户端断开或出错）连接随之释放。
pub struct RelayStream {
    label: String,
    first: Option<Bytes>,
    inner: BoxStream<'static, io::Result<Bytes>>,
    bytes_sent: u64,
    finished: bool,
}

impl RelayStream {
    /// 用首个数据块和剩余的上游流构造。
    pub fn new(
        label: impl Into<String>,
        first: Bytes,
        inner: BoxStream<'static, io::Result<Bytes>>,
    ) -> Self {
        Self {
            label: label.into(),
            first: Some(first),
            inner,
            bytes_sent: 0,
            finished: false,
        }
    }

    /// 已经交给下游的字节数。
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}

impl Stream for RelayStream {
    type Item = std::result::Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(chunk) = this.first.take() {
            this.bytes_sent += chunk.len() as u64;
            return Poll::Ready(Some(Ok(chunk)));
        }
        if this.finished {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                warn!(
                    "[Stream] {} 在发送 {} 字节后中断: {e}",
                    this.label, this.bytes_sent
                );
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        debug!(
            "[Stream] {} 已释放，共转发 {} 字节 (完整: {})。",
            self.label, self.bytes_sent, self.finished
        );
    }
}

/// YouTube 音频流解析器。
#[derive(Clone)]
pub struct StreamResolver {
    backend: Arc<dyn VideoBackend>,
    http_client: Client,
}

impl StreamResolver {
    /// 创建一个新的解析器。
    ///
    /// `http_client` 不应设置整体超时，否则长音频会在中途被截断。
    pub fn new(backend: Arc<dyn VideoBackend>, http_client: Client) -> Self {
        Self {
            backend,
            http_client,
        }
    }

    /// 打开一个视频的最佳纯音频流。
    ///
    /// # 参数
    /// * `video_id` - YouTube 视频 ID。
    /// * `range` - 客户端请求中的 `Range` 头，原样转发给上游。
    ///
    /// # 返回
    /// 成功时已经收到首个数据块，调用方可以安全地发送响应头。
    pub async fn open_stream(&self, video_id: &str, range: Option<&str>) -> Result<AudioStream> {
        let formats = self.backend.resolve_formats(video_id).await?;
        let format = select_best_audio(&formats).ok_or_else(|| {
            MusicBridgeError::Resolution(format!("视频 {video_id} 没有可用的纯音频格式"))
        })?;
        info!(
            "[Stream] 视频 {video_id} 选用格式 {} (abr: {:?})。",
            format.format_id, format.abr
        );

        let mut request = self.http_client.get(&format.url);
        for (name, value) in &format.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(range) = range {
            request = request.header(RANGE, range);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MusicBridgeError::StreamTransport(e.to_string()))?;

        let upstream_status = response.status();
        if !upstream_status.is_success() {
            return Err(MusicBridgeError::StreamTransport(format!(
                "上游返回 HTTP {upstream_status}"
            )));
        }

        let status = if upstream_status == StatusCode::PARTIAL_CONTENT {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };
        let accept_ranges = status == StatusCode::PARTIAL_CONTENT
            || response
                .headers()
                .get(ACCEPT_RANGES)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes"));
        let content_length = response.content_length();
        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut upstream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other))
            .boxed();
        let first = loop {
            match upstream.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => break chunk,
                Some(Err(e)) => return Err(MusicBridgeError::StreamTransport(e.to_string())),
                None => {
                    return Err(MusicBridgeError::StreamTransport(
                        "上游在发送任何数据前关闭了连接".to_string(),
                    ));
                }
            }
        };

        Ok(AudioStream {
            status,
            content_type: format.mime_type().unwrap_or(DEFAULT_CONTENT_TYPE),
            content_length,
            content_range,
            accept_ranges,
            body: RelayStream::new(format!("视频 {video_id}"), first, upstream),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::stream;

    use super::*;
    use crate::providers::youtube::backend::{MediaFormat, VideoEntry};

    struct FixedFormats(Vec<MediaFormat>);

    #[async_trait]
    impl VideoBackend for FixedFormats {
        async fn search(&self, _query: &str, _limit: u32) -> Result<Vec<VideoEntry>> {
            Ok(vec![])
        }

        async fn resolve_formats(&self, _video_id: &str) -> Result<Vec<MediaFormat>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_relay_stream_yields_first_chunk_then_rest() {
        let rest = stream::iter(vec![Ok(Bytes::from_static(b"cd")), Ok(Bytes::from_static(b"e"))]);
        let mut relay = RelayStream::new("test", Bytes::from_static(b"ab"), rest.boxed());

        let mut collected = Vec::new();
        while let Some(chunk) = relay.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }

        assert_eq!(collected, b"abcde");
        assert_eq!(relay.bytes_sent(), 5);
        assert!(relay.next().await.is_none());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_upstream_error_after_first_chunk_ends_the_body() {
        let rest = stream::iter(vec![
            Ok(Bytes::from_static(b"cd")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "upstream reset")),
            Ok(Bytes::from_static(b"never")),
        ]);
        let mut relay = RelayStream::new("test", Bytes::from_static(b"ab"), rest.boxed());

        assert_eq!(relay.next().await.unwrap().unwrap(), Bytes::from_static(b"ab"));
        assert_eq!(relay.next().await.unwrap().unwrap(), Bytes::from_static(b"cd"));

        let err = relay.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);

        assert!(relay.next().await.is_none(), "出错后流应当结束，不再产出数据");
        assert_eq!(relay.bytes_sent(), 4);
        assert!(logs_contain("在发送 4 字节后中断"));
    }

    #[tokio::test]
    async fn test_video_without_audio_only_format_is_resolution_error() {
        let backend = Arc::new(FixedFormats(vec![MediaFormat {
            format_id: "18".to_string(),
            url: "http://127.0.0.1:9/18".to_string(),
            acodec: Some("mp4a.40.2".to_string()),
            vcodec: Some("avc1".to_string()),
            ..Default::default()
        }]));
        let resolver = StreamResolver::new(backend, Client::new());

        let err = resolver.open_stream("dQw4w9WgXcQ", None).await.unwrap_err();
        assert!(matches!(err, MusicBridgeError::Resolution(_)));
    }
}
