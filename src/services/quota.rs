//! Quota mensuel du service OCR en ligne - couche capacité
//!
//! Le palier gratuit d'OCR.space est plafonné par mois calendaire. Le
//! compteur est persisté dans un fichier TOML et remis à zéro au changement
//! de mois.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::OcrError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuotaFile {
    month: String,
    count: u64,
}

/// Suivi du quota mensuel d'appels OCR en ligne
pub struct OcrQuota {
    path: PathBuf,
    limit: u64,
    state: Mutex<QuotaFile>,
}

fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

impl OcrQuota {
    /// Charge le compteur depuis le fichier, en repartant de zéro si le
    /// fichier est absent, illisible ou d'un mois révolu.
    pub fn load(config: &Config) -> Self {
        let path = PathBuf::from(&config.ocr_usage_file);
        let month = current_month();

        let state = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| toml::from_str::<QuotaFile>(&raw).ok())
            .filter(|file| file.month == month)
            .unwrap_or(QuotaFile { month, count: 0 });

        Self {
            path,
            limit: config.ocrspace_monthly_limit,
            state: Mutex::new(state),
        }
    }

    /// Requêtes restantes ce mois-ci
    pub fn remaining(&self) -> u64 {
        self.state
            .lock()
            .map(|s| self.limit.saturating_sub(s.count))
            .unwrap_or(0)
    }

    /// Journalise l'état du quota : utilisation, restant, alertes de seuil
    pub fn log_status(&self) {
        let remaining = self.remaining();
        let used = self.limit.saturating_sub(remaining);
        let pct = if self.limit > 0 {
            used as f64 * 100.0 / self.limit as f64
        } else {
            0.0
        };
        info!(
            "📈 Quota OCR du mois: {}/{} requêtes utilisées ({:.1}%), {} restantes",
            used, self.limit, pct, remaining
        );
        if remaining < 1_000 {
            warn!("🚨 Moins de 1 000 requêtes OCR restantes ce mois-ci");
        } else if remaining < 5_000 {
            warn!("⚠️ Moins de 5 000 requêtes OCR restantes ce mois-ci");
        }
    }

    /// Consomme `requests` unités de quota et persiste le compteur.
    /// Échoue sans consommer si le plafond serait dépassé.
    pub fn consume(&self, requests: u64) -> Result<(), OcrError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| OcrError::CloudService("verrou du quota empoisonné".to_string()))?;

        // Bascule de mois : remise à zéro
        let month = current_month();
        if state.month != month {
            info!("📅 Nouveau mois ({}), compteur OCR remis à zéro", month);
            state.month = month;
            state.count = 0;
        }

        if state.count + requests > self.limit {
            warn!(
                "🚫 Quota OCR mensuel épuisé: {}/{} requêtes",
                state.count, self.limit
            );
            return Err(OcrError::CloudService(format!(
                "quota OCR mensuel épuisé ({}/{})",
                state.count, self.limit
            )));
        }

        state.count += requests;
        let serialized = toml::to_string(&*state)
            .map_err(|e| OcrError::CloudService(format!("sérialisation du quota: {e}")))?;
        std::fs::write(&self.path, serialized)?;

        info!(
            "📈 Quota OCR: {}/{} requêtes utilisées ce mois-ci",
            state.count, self.limit
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota_with_file(dir: &tempfile::TempDir, limit: u64) -> OcrQuota {
        let config = Config {
            ocr_usage_file: dir
                .path()
                .join("ocr_usage.toml")
                .to_string_lossy()
                .into_owned(),
            ocrspace_monthly_limit: limit,
            ..Config::default()
        };
        OcrQuota::load(&config)
    }

    #[test]
    fn test_consume_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let quota = quota_with_file(&dir, 10);
        quota.consume(3).unwrap();
        assert_eq!(quota.remaining(), 7);

        // rechargement depuis le fichier
        let reloaded = quota_with_file(&dir, 10);
        assert_eq!(reloaded.remaining(), 7);
    }

    #[test]
    fn test_consume_refuses_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let quota = quota_with_file(&dir, 5);
        quota.consume(5).unwrap();
        assert!(quota.consume(1).is_err());
        assert_eq!(quota.remaining(), 0);
    }

    #[test]
    fn test_stale_month_resets_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr_usage.toml");
        std::fs::write(&path, "month = \"2020-01\"\ncount = 9999\n").unwrap();

        let config = Config {
            ocr_usage_file: path.to_string_lossy().into_owned(),
            ocrspace_monthly_limit: 10,
            ..Config::default()
        };
        let quota = OcrQuota::load(&config);
        assert_eq!(quota.remaining(), 10);
    }
}
