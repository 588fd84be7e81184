//! Comptabilité d'usage des appels IA - couche capacité
//!
//! Comptage approché en mots, par étape du pipeline. Les compteurs sont
//! remis à zéro au début de chaque correction.

use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

/// Rapport mots → jetons : une approximation grossière suffit pour le suivi
const TOKENS_PER_WORD: f64 = 1.3;
/// Tarif indicatif du palier gratuit Groq, en dollars par million de jetons
const COST_PER_MILLION_TOKENS: f64 = 0.05;

/// Étape du pipeline consommant des appels IA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    NameExtraction,
    Rubric,
    Segmentation,
    Grading,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NameExtraction => "name_extraction",
            Stage::Rubric => "rubric",
            Stage::Segmentation => "segmentation",
            Stage::Grading => "grading",
        }
    }

    const ALL: [Stage; 4] = [
        Stage::NameExtraction,
        Stage::Rubric,
        Stage::Segmentation,
        Stage::Grading,
    ];
}

/// Compteurs d'une étape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageUsage {
    pub calls: u64,
    pub prompt_words: u64,
    pub response_words: u64,
}

impl StageUsage {
    pub fn total_words(&self) -> u64 {
        self.prompt_words + self.response_words
    }
}

/// Relevé complet d'une correction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub name_extraction: StageUsage,
    pub rubric: StageUsage,
    pub segmentation: StageUsage,
    pub grading: StageUsage,
}

impl UsageSnapshot {
    fn stage(&self, stage: Stage) -> &StageUsage {
        match stage {
            Stage::NameExtraction => &self.name_extraction,
            Stage::Rubric => &self.rubric,
            Stage::Segmentation => &self.segmentation,
            Stage::Grading => &self.grading,
        }
    }

    fn stage_mut(&mut self, stage: Stage) -> &mut StageUsage {
        match stage {
            Stage::NameExtraction => &mut self.name_extraction,
            Stage::Rubric => &mut self.rubric,
            Stage::Segmentation => &mut self.segmentation,
            Stage::Grading => &mut self.grading,
        }
    }

    pub fn total_calls(&self) -> u64 {
        Stage::ALL.iter().map(|s| self.stage(*s).calls).sum()
    }

    pub fn total_words(&self) -> u64 {
        Stage::ALL.iter().map(|s| self.stage(*s).total_words()).sum()
    }
}

/// Suivi d'usage partagé entre les étapes du pipeline
#[derive(Default)]
pub struct UsageTracker {
    snapshot: Mutex<UsageSnapshot>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre un appel : taille du prompt et de la réponse, en mots
    pub fn record(&self, stage: Stage, prompt: &str, response: &str) {
        if let Ok(mut snapshot) = self.snapshot.lock() {
            let usage = snapshot.stage_mut(stage);
            usage.calls += 1;
            usage.prompt_words += prompt.split_whitespace().count() as u64;
            usage.response_words += response.split_whitespace().count() as u64;
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        self.snapshot
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Remet tous les compteurs à zéro
    pub fn reset(&self) {
        if let Ok(mut snapshot) = self.snapshot.lock() {
            *snapshot = UsageSnapshot::default();
        }
    }

    /// Journalise le relevé de fin de correction
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        let total = snapshot.total_words();

        info!("📊 ===== Usage IA de la correction =====");
        info!(
            "📊 Appels: {} | Mots échangés: {}",
            snapshot.total_calls(),
            total
        );
        for stage in Stage::ALL {
            let usage = snapshot.stage(stage);
            if usage.calls == 0 {
                continue;
            }
            let pct = if total > 0 {
                usage.total_words() as f64 * 100.0 / total as f64
            } else {
                0.0
            };
            info!(
                "📊   {}: {} appels, {} mots ({:.1}%)",
                stage.as_str(),
                usage.calls,
                usage.total_words(),
                pct
            );
        }
        let est_tokens = total as f64 * TOKENS_PER_WORD;
        info!(
            "📊 Estimation: ~{:.0} jetons, coût ~{:.4} $",
            est_tokens,
            est_tokens / 1_000_000.0 * COST_PER_MILLION_TOKENS
        );
        info!("📊 ======================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_per_stage() {
        let tracker = UsageTracker::new();
        tracker.record(Stage::Grading, "un deux trois", "quatre cinq");
        tracker.record(Stage::Grading, "six", "sept huit");
        tracker.record(Stage::Rubric, "a b", "c");

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.grading.calls, 2);
        assert_eq!(snapshot.grading.prompt_words, 4);
        assert_eq!(snapshot.grading.response_words, 4);
        assert_eq!(snapshot.rubric.calls, 1);
        assert_eq!(snapshot.total_calls(), 3);
        assert_eq!(snapshot.total_words(), 11);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let tracker = UsageTracker::new();
        tracker.record(Stage::Segmentation, "x", "y");
        tracker.reset();
        tracker.reset();
        assert_eq!(tracker.snapshot(), UsageSnapshot::default());
    }
}
