//! 客户端本地的收藏列表。
//!
//! 收藏只存在于播放端本地，服务端从不读取，也不做跨设备同步。

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::Result, model::song::Song};

/// 一个按加入顺序排列、以 `id` 为键的收藏歌曲列表。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites {
    songs: Vec<Song>,
}

impl Favorites {
    /// 创建一个空的收藏列表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换一首歌曲的收藏状态。
    ///
    /// # 返回
    /// 操作之后该歌曲是否处于收藏状态。
    pub fn toggle(&mut self, song: Song) -> bool {
        if let Some(pos) = self.songs.iter().position(|s| s.id == song.id) {
            self.songs.remove(pos);
            false
        } else {
            self.songs.push(song);
            true
        }
    }

    /// 判断指定 ID 的歌曲是否已收藏。
    pub fn contains(&self, id: &str) -> bool {
        self.songs.iter().any(|s| s.id == id)
    }

    /// 按加入顺序遍历收藏。
    pub fn iter(&self) -> impl Iterator<Item = &Song> {
        self.songs.iter()
    }

    /// 收藏数量。
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// 收藏列表是否为空。
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// 从 JSON 文件加载收藏，文件不存在时返回空列表。
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let favorites: Self = serde_json::from_str(&content)?;
                info!("已从 {} 加载 {} 首收藏。", path.display(), favorites.len());
                Ok(favorites)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// 将收藏序列化为 JSON 并保存到文件。
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::song::MediaLink;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            name: format!("Song {id}"),
            primary_artists: "Artist".to_string(),
            image: vec![MediaLink::new("high", "https://img")],
            download_url: vec![MediaLink::new("high", "https://dl")],
            duration: 100,
            kind: "youtube".to_string(),
            url: None,
        }
    }

    #[test]
    fn test_toggle_keeps_insertion_order() {
        let mut favorites = Favorites::new();
        assert!(favorites.toggle(song("a")));
        assert!(favorites.toggle(song("b")));
        assert!(favorites.toggle(song("c")));

        assert!(!favorites.toggle(song("b")), "再次切换应当取消收藏");
        assert!(!favorites.contains("b"));

        let ids: Vec<_> = favorites.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_toggle_is_keyed_by_id() {
        let mut favorites = Favorites::new();
        favorites.toggle(song("a"));

        let mut renamed = song("a");
        renamed.name = "Another Title".to_string();
        assert!(!favorites.toggle(renamed), "相同 id 的歌曲应视为同一首");
        assert!(favorites.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/favorites.json");

        let mut favorites = Favorites::new();
        favorites.toggle(song("a"));
        favorites.toggle(song("b"));
        favorites.save(&path).unwrap();

        let loaded = Favorites::load(&path).unwrap();
        assert_eq!(loaded, favorites);

        let missing = Favorites::load(&dir.path().join("missing.json")).unwrap();
        assert!(missing.is_empty());
    }
}
