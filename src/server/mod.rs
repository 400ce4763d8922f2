//! HTTP 服务。
//!
//! 所有接口都挂在 `/api` 之下；其余路径在配置了前端目录时由静态文件服务接管，
//! 找不到的文件回退到 `index.html`，交由前端路由处理。

use std::{path::Path, sync::Arc};

use axum::{Router, routing::get};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::MusicBridge;

pub mod error;
pub mod handlers;

/// 所有请求共享的只读状态。
#[derive(Clone)]
pub struct AppState {
    /// 顶层客户端。
    pub bridge: Arc<MusicBridge>,
    /// 运行环境名称，仅用于健康检查。
    pub environment: Arc<str>,
}

impl AppState {
    /// 创建共享状态。
    pub fn new(bridge: MusicBridge, environment: impl Into<Arc<str>>) -> Self {
        Self {
            bridge: Arc::new(bridge),
            environment: environment.into(),
        }
    }
}

/// 构建完整的路由。
///
/// # 参数
/// * `state` - 共享状态。
/// * `static_dir` - 前端构建产物目录，为 `None` 时非 API 路径一律返回 404。
pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/search/songs", get(handlers::search_songs))
        .route("/songs/{id}", get(handlers::song_details))
        .route("/trending", get(handlers::trending))
        .route("/youtube/search", get(handlers::youtube_search))
        .route("/youtube-music/search", get(handlers::youtube_music_search))
        .route("/soundcloud/search", get(handlers::soundcloud_search))
        .route("/youtube/stream", get(handlers::youtube_stream))
        .route("/health", get(handlers::health))
        .fallback(handlers::api_not_found)
        .with_state(state);

    let app = Router::new().nest("/api", api);

    let app = match static_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            app.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => app,
    };

    app.layer(TraceLayer::new_for_http())
}
