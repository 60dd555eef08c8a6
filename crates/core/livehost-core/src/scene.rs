//! Broadcast scene switching driven by catalog mentions

use crate::catalog::Catalog;
use crate::Result;
use async_trait::async_trait;

/// External scene-control service seam (obs-websocket or compatible).
/// Implementations may need a lazy reconnect before first use.
#[async_trait]
pub trait SceneController: Send + Sync {
    /// Switch the program scene
    async fn switch_scene(&self, name: &str) -> Result<()>;

    /// List available scene names
    async fn list_scenes(&self) -> Result<Vec<String>>;

    /// Name of the current program scene
    async fn current_scene(&self) -> Result<String>;
}

/// Scans chat text for catalog mentions and fires scene switches.
pub struct SceneTrigger;

impl SceneTrigger {
    /// Match `message` against catalog products (case-insensitive substring
    /// on the product name, or the "produk <id>" alias) and switch to the
    /// first matching product's scene. First match in catalog order wins;
    /// switch failures are logged and swallowed.
    ///
    /// Returns the scene switched to, if any.
    pub async fn maybe_switch(
        message: &str,
        catalog: &Catalog,
        controller: &dyn SceneController,
    ) -> Option<String> {
        let message_lower = message.to_lowercase();

        for product in &catalog.products {
            let name_lower = product.name.to_lowercase();
            if name_lower.trim().is_empty() {
                continue;
            }
            let alias = format!("produk {}", product.id);
            if message_lower.contains(&name_lower) || message_lower.contains(&alias) {
                let Some(scene) = product.scene.as_deref() else {
                    // Mentioned product has no scene bound; first match still
                    // ends the scan
                    return None;
                };
                match controller.switch_scene(scene).await {
                    Ok(()) => {
                        tracing::info!("Switched to scene: {}", scene);
                        return Some(scene.to_string());
                    }
                    Err(e) => {
                        tracing::warn!("Failed to switch scene '{}': {}", scene, e);
                        return None;
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::LiveHostError;
    use std::sync::Mutex;

    struct FakeController {
        switches: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FakeController {
        fn new() -> Self {
            Self {
                switches: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl SceneController for FakeController {
        async fn switch_scene(&self, name: &str) -> Result<()> {
            if self.fail {
                return Err(LiveHostError::scene("not connected"));
            }
            self.switches.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn list_scenes(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn current_scene(&self) -> Result<String> {
            Ok("Main".to_string())
        }
    }

    fn product(id: i64, name: &str, scene: Option<&str>) -> Product {
        Product {
            id,
            name: name.to_string(),
            price: 100_000,
            description: String::new(),
            stock: 1,
            scene: scene.map(|s| s.to_string()),
        }
    }

    fn catalog(products: Vec<Product>) -> Catalog {
        Catalog {
            store_name: "Toko".to_string(),
            products,
            promotions: vec![],
        }
    }

    #[tokio::test]
    async fn test_substring_match_switches_once() {
        let controller = FakeController::new();
        let catalog = catalog(vec![product(1, "Kemeja Merah", Some("SceneA"))]);

        let switched = SceneTrigger::maybe_switch(
            "kak kemeja merah masih ready ga?",
            &catalog,
            &controller,
        )
        .await;

        assert_eq!(switched.as_deref(), Some("SceneA"));
        assert_eq!(*controller.switches.lock().unwrap(), vec!["SceneA"]);
    }

    #[tokio::test]
    async fn test_first_match_in_catalog_order_wins() {
        let controller = FakeController::new();
        let catalog = catalog(vec![
            product(1, "Kemeja", Some("SceneA")),
            product(2, "Kemeja Merah", Some("SceneB")),
        ]);

        SceneTrigger::maybe_switch("ada kemeja merah?", &catalog, &controller).await;
        assert_eq!(*controller.switches.lock().unwrap(), vec!["SceneA"]);
    }

    #[tokio::test]
    async fn test_index_alias_matches() {
        let controller = FakeController::new();
        let catalog = catalog(vec![product(3, "Tas Selempang", Some("SceneC"))]);

        let switched =
            SceneTrigger::maybe_switch("spill produk 3 dong", &catalog, &controller).await;
        assert_eq!(switched.as_deref(), Some("SceneC"));
    }

    #[tokio::test]
    async fn test_no_match_no_side_effect() {
        let controller = FakeController::new();
        let catalog = catalog(vec![product(1, "Kemeja", Some("SceneA"))]);

        let switched = SceneTrigger::maybe_switch("halo semua", &catalog, &controller).await;
        assert!(switched.is_none());
        assert!(controller.switches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_switch_failure_is_non_fatal() {
        let mut controller = FakeController::new();
        controller.fail = true;
        let catalog = catalog(vec![product(1, "Kemeja", Some("SceneA"))]);

        let switched = SceneTrigger::maybe_switch("kemeja ready?", &catalog, &controller).await;
        assert!(switched.is_none());
    }
}
