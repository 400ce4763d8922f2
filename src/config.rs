//! 负责加载应用配置。
//!
//! 配置按以下顺序逐层覆盖：默认值 → JSON 配置文件 → 环境变量（含 `.env`）。
//! 命令行参数由可执行文件在此之后再覆盖一次。

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{MusicBridgeError, Result},
    providers::ProviderKind,
};

const CONFIG_DIR_NAME: &str = "music-bridge";
const CONFIG_FILE_NAME: &str = "config.json";

/// 每个接口使用的提供商回退链，按优先级排列。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    /// `/api/search/songs`
    pub songs: Vec<ProviderKind>,
    /// `/api/trending`
    pub trending: Vec<ProviderKind>,
    /// `/api/soundcloud/search`
    pub soundcloud: Vec<ProviderKind>,
    /// `/api/youtube/search`
    pub youtube: Vec<ProviderKind>,
    /// `/api/youtube-music/search`
    pub youtube_music: Vec<ProviderKind>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            songs: vec![ProviderKind::JioSaavn, ProviderKind::YouTube],
            trending: vec![ProviderKind::SoundCloud, ProviderKind::YouTube],
            soundcloud: vec![ProviderKind::SoundCloud, ProviderKind::YouTube],
            youtube: vec![ProviderKind::YouTube],
            youtube_music: vec![ProviderKind::YouTubeMusic],
        }
    }
}

impl ChainConfig {
    /// 检查每条回退链至少包含一个提供商。
    pub fn validate(&self) -> Result<()> {
        let chains = [
            ("songs", &self.songs),
            ("trending", &self.trending),
            ("soundcloud", &self.soundcloud),
            ("youtube", &self.youtube),
            ("youtube_music", &self.youtube_music),
        ];
        for (name, chain) in chains {
            if chain.is_empty() {
                return Err(MusicBridgeError::Configuration(format!(
                    "回退链 '{name}' 不能为空"
                )));
            }
        }
        Ok(())
    }
}

/// 应用的完整配置。
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// 监听地址。
    pub host: String,
    /// 监听端口。
    pub port: u16,
    /// 运行环境名称，仅用于健康检查回显。
    pub environment: String,
    /// 前端构建产物目录，设置后非 API 路径将由它提供。
    pub static_dir: Option<PathBuf>,
    /// JioSaavn 镜像 API 的根地址。
    pub saavn_api_base: String,
    /// SoundCloud API 的根地址。
    pub soundcloud_api_base: String,
    /// SoundCloud 客户端凭据，缺失时 SoundCloud 将回退到 YouTube。
    pub soundcloud_client_id: Option<String>,
    /// `yt-dlp` 可执行文件路径。
    pub ytdlp_path: PathBuf,
    /// 普通 HTTP 请求的超时（秒）。
    pub request_timeout_secs: u64,
    /// SoundCloud 请求的超时（秒）。
    pub soundcloud_timeout_secs: u64,
    /// `yt-dlp` 子进程的超时（秒）。
    pub ytdlp_timeout_secs: u64,
    /// 回退链中单个提供商调用的总超时（秒）。
    pub provider_timeout_secs: u64,
    /// 各接口的回退链。
    pub chains: ChainConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            static_dir: None,
            saavn_api_base: "https://saavn.me/api".to_string(),
            soundcloud_api_base: "https://api-v2.soundcloud.com".to_string(),
            soundcloud_client_id: None,
            ytdlp_path: PathBuf::from("yt-dlp"),
            request_timeout_secs: 10,
            soundcloud_timeout_secs: 5,
            ytdlp_timeout_secs: 20,
            provider_timeout_secs: 25,
            chains: ChainConfig::default(),
        }
    }
}

impl AppConfig {
    /// 按层次加载配置。
    ///
    /// # 参数
    /// * `explicit_path` - 显式指定的配置文件；为 `None` 时尝试用户配置目录下的默认文件。
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            warn!("读取 .env 文件失败: {e}");
        }

        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => match get_config_file_path(CONFIG_FILE_NAME) {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.chains.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载配置，未出现的字段使用默认值。
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        info!("已从 {} 加载配置。", path.display());
        Ok(config)
    }

    /// 用环境变量覆盖配置。
    ///
    /// 通过闭包读取变量，便于在测试中注入。
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("SOUNDCLOUD_CLIENT_ID") {
            self.soundcloud_client_id = Some(id);
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!("忽略无效的 PORT '{port}': {e}"),
            }
        }
        if let Some(env) = lookup("MUSIC_BRIDGE_ENV") {
            self.environment = env;
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(base) = lookup("SAAVN_API_BASE") {
            self.saavn_api_base = base;
        }
        if let Some(path) = lookup("YTDLP_PATH") {
            self.ytdlp_path = PathBuf::from(path);
        }
    }

    /// 返回非空的 SoundCloud 凭据。
    pub fn soundcloud_client_id(&self) -> Option<&str> {
        self.soundcloud_client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// 普通 HTTP 请求的超时。
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// SoundCloud 请求的超时。
    pub fn soundcloud_timeout(&self) -> Duration {
        Duration::from_secs(self.soundcloud_timeout_secs)
    }

    /// `yt-dlp` 子进程的超时。
    pub fn ytdlp_timeout(&self) -> Duration {
        Duration::from_secs(self.ytdlp_timeout_secs)
    }

    /// 单个提供商调用的总超时。
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

/// 获取应用配置目录下指定文件的完整路径。
///
/// # 参数
/// * `filename` - 目标配置文件的名称，例如 "config.json"。
pub fn get_config_file_path(filename: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|mut dir| {
        dir.push(CONFIG_DIR_NAME);
        dir.push(filename);
        dir
    })
}
