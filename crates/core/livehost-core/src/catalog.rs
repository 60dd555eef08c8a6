//! Product catalog, promotions and the read-only settings store seam

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One product in the store catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned product id
    pub id: i64,
    /// Product name, matched against chat messages by the scene trigger
    pub name: String,
    /// Price in rupiah
    pub price: u64,
    /// Short sales description
    #[serde(default)]
    pub description: String,
    /// Units in stock
    #[serde(default)]
    pub stock: u32,
    /// Broadcast scene shown when this product comes up, if any
    #[serde(default)]
    pub scene: Option<String>,
}

/// An active promotion code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    /// Promo code
    pub code: String,
    /// What the code does
    pub description: String,
}

/// Store catalog as rendered into the system prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Store display name
    pub store_name: String,
    /// Products, in catalog order
    #[serde(default)]
    pub products: Vec<Product>,
    /// Active promotions
    #[serde(default)]
    pub promotions: Vec<Promotion>,
}

impl Catalog {
    /// Empty catalog under a placeholder store name, the degraded form used
    /// when catalog data is missing or malformed
    pub fn empty() -> Self {
        Self {
            store_name: "Toko Online".to_string(),
            products: Vec::new(),
            promotions: Vec::new(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::empty()
    }
}

/// One uploaded idle filler track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleTrack {
    /// Store-assigned track id
    pub id: i64,
    /// Audio file path
    pub path: PathBuf,
    /// Original upload name, for logs
    pub title: String,
    /// Inactive tracks are skipped by the scheduler
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Read-only view of the settings/catalog store.
///
/// Persistence and CRUD live in the dashboard layer; the pipeline only ever
/// reads.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Current catalog; implementations degrade to [`Catalog::empty`]
    /// rather than failing
    async fn catalog(&self) -> Catalog;

    /// Single setting lookup
    async fn setting(&self, key: &str) -> Option<String>;

    /// Enabled idle filler tracks, in upload order
    async fn active_idle_tracks(&self) -> Vec<IdleTrack>;
}

/// Catalog store backed by a JSON file on disk.
///
/// The file holds `{store_name, products, promotions}` plus optional
/// `settings` and `idle_tracks` blocks. Reloaded on every read so edits show
/// up without a restart.
pub struct FileCatalogStore {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(flatten)]
    catalog: Catalog,
    #[serde(default)]
    settings: HashMap<String, String>,
    #[serde(default)]
    idle_tracks: Vec<IdleTrack>,
}

impl FileCatalogStore {
    /// Create a store reading from the given JSON file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Option<CatalogFile> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Cannot read catalog file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!("Malformed catalog file {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl CatalogStore for FileCatalogStore {
    async fn catalog(&self) -> Catalog {
        self.load().map(|f| f.catalog).unwrap_or_else(Catalog::empty)
    }

    async fn setting(&self, key: &str) -> Option<String> {
        self.load().and_then(|f| f.settings.get(key).cloned())
    }

    async fn active_idle_tracks(&self) -> Vec<IdleTrack> {
        self.load()
            .map(|f| f.idle_tracks.into_iter().filter(|t| t.enabled).collect())
            .unwrap_or_default()
    }
}

/// In-memory catalog store for tests and demo wiring
#[derive(Default)]
pub struct MemoryCatalogStore {
    /// Catalog served to readers
    pub catalog: Catalog,
    /// Settings map
    pub settings: HashMap<String, String>,
    /// Idle tracks, enabled or not
    pub idle_tracks: Vec<IdleTrack>,
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn catalog(&self) -> Catalog {
        self.catalog.clone()
    }

    async fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).cloned()
    }

    async fn active_idle_tracks(&self) -> Vec<IdleTrack> {
        self.idle_tracks
            .iter()
            .filter(|t| t.enabled)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_degrades_to_empty_catalog() {
        let store = FileCatalogStore::new("/definitely/not/here.json");
        let catalog = store.catalog().await;
        assert!(catalog.products.is_empty());
        assert!(store.setting("store_name").await.is_none());
        assert!(store.active_idle_tracks().await.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_filters_disabled_tracks() {
        let store = MemoryCatalogStore {
            idle_tracks: vec![
                IdleTrack {
                    id: 1,
                    path: PathBuf::from("a.mp3"),
                    title: "a".into(),
                    enabled: true,
                },
                IdleTrack {
                    id: 2,
                    path: PathBuf::from("b.mp3"),
                    title: "b".into(),
                    enabled: false,
                },
            ],
            ..Default::default()
        };
        let active = store.active_idle_tracks().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);
    }

    #[test]
    fn test_catalog_file_parses_with_optional_blocks() {
        let json = r#"{
            "store_name": "Toko Hana",
            "products": [
                {"id": 1, "name": "Kemeja Merah", "price": 150000}
            ],
            "promotions": [],
            "settings": {"filter_enabled": "true"},
            "idle_tracks": [
                {"id": 1, "path": "idle/a.mp3", "title": "opener"}
            ]
        }"#;
        let file: CatalogFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.catalog.store_name, "Toko Hana");
        assert_eq!(file.catalog.products[0].price, 150_000);
        assert_eq!(file.settings["filter_enabled"], "true");
        assert!(file.idle_tracks[0].enabled);
    }
}
