//! Promo/menu content provider.
//!
//! The management surface owns the promo document; this worker only reads
//! it. The file is re-read on every call so an operator edit shows up in
//! the very next reply without a restart.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Current promotional content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoContent {
    /// Promo body shown for the "promo of the day" menu option.
    pub body_text: String,
    /// Link to the external order catalog.
    pub catalog_link: String,
}

impl Default for PromoContent {
    fn default() -> Self {
        Self {
            body_text: "Promoção indisponível no momento.".to_string(),
            catalog_link: "https://pedido.anota.ai/".to_string(),
        }
    }
}

/// Read-only source of the current promo content.
#[async_trait]
pub trait PromoProvider: Send + Sync {
    async fn current(&self) -> PromoContent;
}

/// File-backed provider: reads a JSON document on every call and falls
/// back to the defaults when the file is missing or malformed.
pub struct FilePromo {
    path: PathBuf,
}

impl FilePromo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PromoProvider for FilePromo {
    async fn current(&self) -> PromoContent {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), "Malformed promo document: {}", e);
                PromoContent::default()
            }),
            Err(e) => {
                tracing::debug!(path = %self.path.display(), "Promo document unavailable: {}", e);
                PromoContent::default()
            }
        }
    }
}

/// Fixed in-memory provider (for tests and single-binary setups).
pub struct StaticPromo {
    content: PromoContent,
}

impl StaticPromo {
    pub fn new(content: PromoContent) -> Self {
        Self { content }
    }
}

#[async_trait]
impl PromoProvider for StaticPromo {
    async fn current(&self) -> PromoContent {
        self.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let promo = FilePromo::new("/nonexistent/promo.json");
        let content = promo.current().await;
        assert_eq!(content.catalog_link, "https://pedido.anota.ai/");
    }

    #[tokio::test]
    async fn reads_document_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promo.json");
        tokio::fs::write(
            &path,
            r#"{"body_text":"Compre 1 temaki, leve um suco","catalog_link":"https://example.com/menu"}"#,
        )
        .await
        .unwrap();

        let promo = FilePromo::new(&path);
        let content = promo.current().await;
        assert_eq!(content.body_text, "Compre 1 temaki, leve um suco");
        assert_eq!(content.catalog_link, "https://example.com/menu");
    }

    #[tokio::test]
    async fn malformed_document_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promo.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let content = FilePromo::new(&path).current().await;
        assert_eq!(content.body_text, PromoContent::default().body_text);
    }
}
