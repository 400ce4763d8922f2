//! 此模块定义了所有用于反序列化 JioSaavn 镜像 API 响应的 `struct` 数据结构。
//!
//! 不同版本的镜像字段并不一致（数字与字符串混用、`link` 与 `url` 混用），
//! 因此这里的模型尽量宽松，具体取值交给映射函数处理。

use serde::Deserialize;
use serde_json::Value;

/// 自定义反序列化模块，接受数字、数字字符串或 `null`。
mod de_lenient_u64 {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse::<f64>().map_or(0, |f| f.max(0.0) as u64),
            _ => 0,
        })
    }
}

/// 自定义反序列化模块，只接受数组，其他形状（如 `false`、`null`）视为空列表。
/// 数组中无法解析的元素会被跳过。
mod de_lenient_list {
    use serde::{Deserialize, Deserializer, de::DeserializeOwned};
    use serde_json::Value;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// 搜索与详情接口共享的顶层响应结构。
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// 接口状态，成功时为 `"SUCCESS"`，部分镜像不返回。
    pub status: Option<String>,
    /// 出错时的提示信息。
    pub message: Option<String>,
    /// 实际数据。
    pub data: Option<T>,
}

/// 搜索结果的数据部分。
#[derive(Debug, Deserialize)]
pub struct SearchData {
    /// 匹配到的歌曲总数。
    pub total: Option<u64>,
    /// 匹配到的歌曲列表，逐条解析为 [`SaavnSong`]。
    #[serde(default)]
    pub results: Vec<Value>,
}

/// 代表一首歌曲。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaavnSong {
    /// 歌曲 ID。
    pub id: String,
    /// 歌曲名。
    #[serde(default)]
    pub name: String,
    /// 歌曲类型，通常是 `"song"`。
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// 时长（秒），可能是字符串。
    #[serde(default, with = "de_lenient_u64")]
    pub duration: u64,
    /// 旧版镜像使用的演唱者字符串。
    pub primary_artists: Option<String>,
    /// 新版镜像使用的艺术家对象。
    pub artists: Option<SaavnArtists>,
    /// 封面列表。
    #[serde(default, deserialize_with = "de_lenient_list::deserialize")]
    pub image: Vec<SaavnLink>,
    /// 下载链接列表，旧版镜像在没有链接时会返回 `false`。
    #[serde(default, deserialize_with = "de_lenient_list::deserialize")]
    pub download_url: Vec<SaavnLink>,
    /// 歌曲页面链接。
    pub url: Option<String>,
}

/// 新版镜像的艺术家分组。
#[derive(Debug, Deserialize)]
pub struct SaavnArtists {
    /// 主唱。
    #[serde(default)]
    pub primary: Vec<SaavnArtist>,
}

/// 单个艺术家。
#[derive(Debug, Deserialize)]
pub struct SaavnArtist {
    /// 艺术家姓名。
    pub name: String,
}

/// 封面或下载链接。旧版字段名为 `link`，新版为 `url`。
#[derive(Debug, Deserialize)]
pub struct SaavnLink {
    /// 质量标签。
    #[serde(default)]
    pub quality: String,
    /// 旧版链接字段。
    pub link: Option<String>,
    /// 新版链接字段。
    pub url: Option<String>,
}

impl SaavnLink {
    /// 取出实际的链接地址。
    pub fn href(&self) -> Option<&str> {
        self.link.as_deref().or(self.url.as_deref())
    }
}
