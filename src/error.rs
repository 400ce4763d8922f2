//! 定义了整个 `music-bridge` 库的错误类型 `MusicBridgeError`。

use std::io;
use thiserror::Error;

/// `music-bridge` 库的通用错误枚举。
#[derive(Error, Debug)]
pub enum MusicBridgeError {
    /// 网络请求失败 (源自 `reqwest::Error`)
    #[error("网络请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// JSON 解析失败 (源自 `serde_json::Error`)
    #[error("JSON 解析失败: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// I/O 错误 (源自 `io::Error`)
    #[error("I/O 错误: {0}")]
    Io(#[from] io::Error),

    /// 请求参数缺失或无效，不会触发回退
    #[error("{0}")]
    Validation(String),

    /// 提供商缺少必要的配置（例如凭据）
    #[error("配置缺失: {0}")]
    Configuration(String),

    /// API 返回错误或无法识别的数据
    #[error("API 为 `{0}` 返回了错误或空数据")]
    ApiError(String),

    /// 提供商调用超时
    #[error("提供商 '{provider}' 在 {secs} 秒内没有响应")]
    Timeout {
        /// 超时的提供商名称
        provider: &'static str,
        /// 超时时长（秒）
        secs: u64,
    },

    /// 不支持的提供商或操作
    #[error("不支持的提供商: '{0}'")]
    ProviderNotSupported(String),

    /// 找不到指定的视频
    #[error("找不到视频: '{0}'")]
    VideoNotFound(String),

    /// 没有可播放的纯音频格式
    #[error("无法解析音频流: {0}")]
    Resolution(String),

    /// 音频流传输失败
    #[error("音频流传输失败: {0}")]
    StreamTransport(String),

    /// 回退链中的所有提供商都失败了
    #[error("{0}")]
    AllProvidersFailed(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl MusicBridgeError {
    /// 判断此错误是否应当让回退链尝试下一个提供商。
    ///
    /// 参数校验错误属于调用方的问题，换一个提供商也不会好转。
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}

/// `MusicBridgeError` 的 `Result` 类型别名，方便在函数签名中使用。
pub type Result<T> = std::result::Result<T, MusicBridgeError>;
