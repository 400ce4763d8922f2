use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use music_bridge_rs::{
    MusicBridge,
    config::AppConfig,
    server::{self, AppState},
};

#[derive(Parser, Debug)]
#[command(name = "music-bridge", version, about = "聚合多个音乐平台的搜索与音频流代理")]
struct Args {
    /// 监听地址，覆盖配置文件和 HOST 环境变量
    #[arg(long)]
    host: Option<String>,

    /// 监听端口，覆盖配置文件和 PORT 环境变量
    #[arg(long)]
    port: Option<u16>,

    /// JSON 配置文件路径
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 前端构建产物目录
    #[arg(long, value_name = "DIR")]
    static_dir: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = self.static_dir {
            config.static_dir = Some(dir);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,music_bridge_rs=debug"));
    let _ = FmtSubscriber::builder().with_env_filter(filter).try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("无法监听 Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("无法监听 SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("收到退出信号，正在优雅关闭...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref()).context("加载配置失败")?;
    args.apply(&mut config);

    let bridge = MusicBridge::from_config(&config).context("初始化提供商失败")?;
    let state = AppState::new(bridge, config.environment.clone());

    if let Some(dir) = &config.static_dir
        && !dir.join("index.html").is_file()
    {
        warn!("静态目录 {} 中没有 index.html", dir.display());
    }
    let app = server::router(state, config.static_dir.as_deref());

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("无法绑定 {}:{}", config.host, config.port))?;
    let addr = listener.local_addr()?;

    info!(
        "服务已启动: http://{addr} (环境: {}, SoundCloud 已配置: {})",
        config.environment,
        config.soundcloud_client_id().is_some()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务异常退出")?;

    Ok(())
}
