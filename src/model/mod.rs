//! 定义了整个库通用的、与具体提供商无关的数据模型。

pub mod favorites;
pub mod song;

/// 一次搜索请求的参数。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// 自由文本关键词。
    pub query: String,
    /// 页码（通常从 1 开始），由提供商自行解释。
    pub page: Option<u32>,
    /// 每页数量上限。
    pub limit: Option<u32>,
}

impl SearchQuery {
    /// 仅用关键词创建一个搜索请求。
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// 设置每页数量上限。
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 设置页码。
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}
