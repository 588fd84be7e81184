//! Utilitaires de journalisation
//!
//! Initialisation du souscripteur `tracing` et fonctions d'affichage des
//! bannières d'étape de la correction.

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialise la journalisation globale.
///
/// Le niveau par défaut est `info`, surchargeable par `RUST_LOG` ;
/// `verbose` force le niveau `debug`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Bannière de démarrage d'une correction
pub fn log_run_start(session_id: &str, copies: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 Démarrage de la correction - session {}", session_id);
    info!("📄 {} copie(s) à corriger", copies);
    info!("{}", "=".repeat(60));
}

/// Bannière d'étape du pipeline
pub fn log_step(step: usize, total: usize, label: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📦 Étape {}/{} : {}", step, total, label);
    info!("{}", "─".repeat(60));
}

/// Bilan final d'une correction
pub fn log_run_complete(graded: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 Correction terminée");
    info!(
        "Heure de fin: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ Copies notées: {}/{}", graded, total);
    info!("❌ Copies en échec: {}", failed);
    info!("{}", "=".repeat(60));
}

/// Tronque un texte long pour l'affichage dans les journaux
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
