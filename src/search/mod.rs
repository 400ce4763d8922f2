//! 搜索模块
//!
//! 按优先级依次尝试多个提供商，第一个成功的提供商的结果即为最终结果。

use std::{sync::Arc, time::Duration};

use tracing::{error, info, warn};

use crate::{
    error::{MusicBridgeError, Result},
    model::{SearchQuery, song::Song},
    providers::Provider,
};

/// 所有提供商都失败时对外返回的信息。
pub const ALL_FAILED_MESSAGE: &str = "All platforms failed";

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(25);

/// 回退链的一次成功结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    /// 实际给出结果的提供商名称。
    pub source: &'static str,
    /// 该提供商返回的歌曲，可能为空。
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, Copy)]
enum Operation<'a> {
    Search(&'a SearchQuery),
    Trending,
}

impl Operation<'_> {
    fn describe(&self) -> String {
        match self {
            Operation::Search(q) => format!("搜索 '{}'", q.query),
            Operation::Trending => "获取热门".to_string(),
        }
    }
}

/// 一条按优先级排列的提供商回退链。
#[derive(Clone)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn Provider>>,
    provider_timeout: Duration,
}

impl FallbackChain {
    /// 创建一条回退链，`providers` 的顺序即为尝试顺序。
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// 设置单个提供商调用的总超时。
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// 链中提供商的名称，按尝试顺序排列。
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 依次在链中的提供商上搜索歌曲。
    pub async fn resolve(&self, query: &SearchQuery) -> Result<ChainOutcome> {
        self.run(Operation::Search(query)).await
    }

    /// 依次在链中的提供商上获取热门歌曲。
    pub async fn trending(&self) -> Result<ChainOutcome> {
        self.run(Operation::Trending).await
    }

    async fn call(&self, provider: &dyn Provider, op: Operation<'_>) -> Result<Vec<Song>> {
        let fut = async {
            match op {
                Operation::Search(query) => provider.search_songs(query).await,
                Operation::Trending => provider.trending().await,
            }
        };

        tokio::time::timeout(self.provider_timeout, fut)
            .await
            .map_err(|_| MusicBridgeError::Timeout {
                provider: provider.name(),
                secs: self.provider_timeout.as_secs(),
            })?
    }

    async fn run(&self, op: Operation<'_>) -> Result<ChainOutcome> {
        let mut failures: Vec<(&'static str, MusicBridgeError)> = Vec::new();

        for (i, provider) in self.providers.iter().enumerate() {
            let name = provider.name();
            match self.call(provider.as_ref(), op).await {
                Ok(songs) => {
                    if i > 0 {
                        info!(
                            "[{name}] 回退成功，{}返回 {} 条结果。",
                            op.describe(),
                            songs.len()
                        );
                    }
                    return Ok(ChainOutcome {
                        source: name,
                        songs,
                    });
                }
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => {
                    if self.providers.len() > 1 {
                        warn!("[{name}] {}失败: {e}。尝试下一个提供商。", op.describe());
                    }
                    failures.push((name, e));
                }
            }
        }

        if self.providers.len() == 1
            && let Some((name, e)) = failures.pop()
        {
            error!("[{name}] {}失败: {e}", op.describe());
            return Err(e);
        }

        for (name, e) in &failures {
            error!("[{name}] {}失败: {e}", op.describe());
        }
        Err(MusicBridgeError::AllProvidersFailed(
            ALL_FAILED_MESSAGE.to_string(),
        ))
    }
}
