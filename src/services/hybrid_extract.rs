//! Extraction de texte hybride - couche capacité
//!
//! Choisit le moteur OCR selon la nature du document : le texte imprimé
//! est lu localement par Tesseract, le manuscrit part vers le service en
//! ligne (sous quota mensuel). La détection se fait sur la première page,
//! par confiance moyenne de reconnaissance.

use std::path::Path;

use tracing::{info, warn};

use crate::clients::OcrSpaceClient;
use crate::config::Config;
use crate::error::OcrError;
use crate::services::local_ocr::LocalOcr;
use crate::services::page_raster::PageRaster;
use crate::services::quota::OcrQuota;

/// Séparateur inséré entre les pages d'un document extrait en bloc
pub const PAGE_BREAK: &str = "\n\n--- PAGE SUIVANTE ---\n\n";

/// Choix du moteur d'extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Détection automatique sur la première page
    Auto,
    /// Tesseract local (texte imprimé)
    Local,
    /// OCR.space (texte manuscrit)
    Cloud,
}

/// Extracteur hybride local/cloud
pub struct HybridExtractor {
    raster: PageRaster,
    local: LocalOcr,
    cloud: OcrSpaceClient,
    quota: OcrQuota,
    printed_threshold: f64,
}

impl HybridExtractor {
    pub fn new(config: &Config) -> Self {
        let quota = OcrQuota::load(config);
        quota.log_status();
        Self {
            raster: PageRaster::new(config),
            local: LocalOcr::new(config),
            cloud: OcrSpaceClient::new(config),
            quota,
            printed_threshold: config.printed_confidence_threshold,
        }
    }

    /// Extrait le texte page par page.
    ///
    /// Les pages vides sont conservées (chaîne vide) pour que la position
    /// des pages dans le lot reste exacte.
    pub async fn extract_pages(
        &self,
        path: &Path,
        mode: EngineMode,
    ) -> Result<Vec<String>, OcrError> {
        let rendered = self.raster.rasterize(path).await?;

        let use_local = match mode {
            EngineMode::Local => true,
            EngineMode::Cloud => false,
            EngineMode::Auto => self.detect_printed(rendered.pages()).await?,
        };

        if use_local {
            info!(
                "📄 Extraction locale (imprimé): {} page(s)",
                rendered.page_count()
            );
            let mut pages = Vec::with_capacity(rendered.page_count());
            for (i, page_path) in rendered.pages().iter().enumerate() {
                // une page illisible ne condamne pas les autres
                match self.local.recognize(page_path).await {
                    Ok(text) => pages.push(text),
                    Err(e) => {
                        warn!("⚠️ Page {} illisible ({}), page vide conservée", i + 1, e);
                        pages.push(String::new());
                    }
                }
            }
            Ok(pages)
        } else {
            info!(
                "☁️ Extraction en ligne (manuscrit): {} page(s), quota restant: {}",
                rendered.page_count(),
                self.quota.remaining()
            );
            if self.quota.remaining() == 0 {
                return Err(OcrError::CloudService(
                    "quota OCR mensuel épuisé".to_string(),
                ));
            }
            let pages = self.cloud.parse_pages(path).await?;
            // seules les requêtes abouties comptent dans le quota
            self.quota.consume(1)?;
            Ok(pages)
        }
    }

    /// Extrait le texte complet d'un document, pages jointes par [`PAGE_BREAK`]
    pub async fn extract_document(
        &self,
        path: &Path,
        mode: EngineMode,
    ) -> Result<String, OcrError> {
        let pages = self.extract_pages(path, mode).await?;
        let non_empty: Vec<&str> = pages
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(non_empty.join(PAGE_BREAK))
    }

    /// Mesure la confiance Tesseract sur la première page : au-delà du
    /// seuil, le document est considéré imprimé.
    async fn detect_printed(&self, pages: &[std::path::PathBuf]) -> Result<bool, OcrError> {
        let Some(first_page) = pages.first() else {
            return Ok(true);
        };

        let confidence = match self.local.mean_confidence(first_page).await {
            Ok(conf) => conf,
            Err(e) => {
                warn!("🔍 Détection impossible ({}), bascule vers le cloud", e);
                return Ok(false);
            }
        };

        let printed = confidence > self.printed_threshold;
        if printed {
            info!(
                "🔍 Document imprimé détecté (confiance {:.1} > {:.1})",
                confidence, self.printed_threshold
            );
        } else {
            info!(
                "🔍 Document manuscrit détecté (confiance {:.1} ≤ {:.1})",
                confidence, self.printed_threshold
            );
        }
        Ok(printed)
    }
}
