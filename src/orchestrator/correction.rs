//! Exécution d'une correction complète - couche orchestration
//!
//! Seule couche à connaître l'ordre des étapes : extraction des
//! documents, barème, découpage de la correction de référence, puis
//! notation copie par copie. Les échecs fatals (document illisible,
//! barème introuvable) interrompent tout ; un échec limité à une copie
//! n'empêche pas la notation des autres.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::clients::AiGateway;
use crate::config::Config;
use crate::error::{CorrectionError, Result};
use crate::models::{CopyOutcome, Session};
use crate::services::grader::AiGrader;
use crate::services::hybrid_extract::{EngineMode, HybridExtractor};
use crate::services::rubric_extract::RubricExtractor;
use crate::services::segmenter::AnswerSegmenter;
use crate::services::usage::UsageTracker;
use crate::utils::logging::{log_run_complete, log_run_start, log_step};

/// Services partagés par toutes les étapes d'une correction
pub struct CorrectionContext {
    pub gateway: Arc<AiGateway>,
    pub hybrid: HybridExtractor,
    pub rubric_extractor: RubricExtractor,
    pub segmenter: AnswerSegmenter,
    pub grader: AiGrader,
    pub usage: Arc<UsageTracker>,
}

impl CorrectionContext {
    pub fn new(config: &Config) -> Result<Self> {
        let gateway = Arc::new(AiGateway::new(config)?);
        let usage = Arc::new(UsageTracker::new());
        Ok(Self {
            hybrid: HybridExtractor::new(config),
            rubric_extractor: RubricExtractor::new(gateway.clone(), usage.clone()),
            segmenter: AnswerSegmenter::new(gateway.clone(), usage.clone()),
            grader: AiGrader::new(gateway.clone(), usage.clone()),
            gateway,
            usage,
        })
    }
}

/// Corrige toutes les copies d'une session.
///
/// Retourne une issue par copie, dans l'ordre du lot. Une erreur fatale
/// annule la correction entière sans résultat partiel.
pub async fn run_correction(
    session: &Session,
    ctx: &CorrectionContext,
) -> Result<Vec<CopyOutcome>> {
    ctx.usage.reset();
    log_run_start(&session.id, session.copies.len());

    // Étape 1 : texte de l'épreuve
    log_step(1, 5, "Extraction de l'épreuve");
    let epreuve = session
        .epreuve
        .as_ref()
        .ok_or(CorrectionError::MissingDocument("épreuve"))?;
    let exam_text = extract_required(ctx, &epreuve.path).await?;
    info!("✅ Épreuve extraite: {} caractères", exam_text.len());

    // Étape 2 : barème
    log_step(2, 5, "Extraction du barème");
    let extracted = ctx.rubric_extractor.extract(&exam_text).await?;
    let rubric = extracted.rubric;
    info!(
        "✅ Barème final: {} question(s), {} points",
        rubric.len(),
        rubric.total_points()
    );

    // Étape 3 : correction de référence
    log_step(3, 5, "Extraction de la correction de référence");
    let correction = session
        .correction
        .as_ref()
        .ok_or(CorrectionError::MissingDocument("correction"))?;
    let reference_text = extract_required(ctx, &correction.path).await?;
    info!("✅ Correction extraite: {} caractères", reference_text.len());

    // Étape 4 : découpage de la référence
    log_step(4, 5, "Découpage de la correction de référence");
    let reference_answers = ctx.segmenter.segment(&reference_text, &rubric).await;
    info!(
        "✅ Référence découpée ({:?}): {} question(s)",
        reference_answers.tier,
        reference_answers.answers.len()
    );

    // Étape 5 : notation copie par copie
    log_step(5, 5, "Correction des copies");
    let total_copies = session.copies.len();
    let mut outcomes = Vec::with_capacity(total_copies);
    let mut graded = 0usize;

    for (idx, copy) in session.copies.iter().enumerate() {
        info!(
            "\n👤 Copie {}/{} : {} ({})",
            idx + 1,
            total_copies,
            copy.nom_eleve,
            copy.classe
        );

        if copy.texte_complet.trim().is_empty() {
            error!("❌ Copie de {} sans texte exploitable", copy.nom_eleve);
            outcomes.push(CopyOutcome::Failed {
                nom_eleve: copy.nom_eleve.clone(),
                classe: copy.classe.clone(),
                erreur: "aucun texte exploitable pour cette copie".to_string(),
            });
            continue;
        }

        let segmented = ctx.segmenter.segment(&copy.texte_complet, &rubric).await;
        let (details, note_finale) = crate::workflow::grade_copy(
            &rubric,
            &segmented.answers,
            &reference_answers.answers,
            &ctx.grader,
        )
        .await;

        info!(
            "  📊 Note finale: {} / {}",
            note_finale,
            rubric.total_points()
        );
        graded += 1;
        outcomes.push(CopyOutcome::Graded {
            nom_eleve: copy.nom_eleve.clone(),
            classe: copy.classe.clone(),
            note_finale,
            note_maximale: rubric.total_points(),
            details,
        });
    }

    log_run_complete(graded, total_copies - graded, total_copies);
    ctx.usage.log_summary();

    Ok(outcomes)
}

/// Extrait un document dont le texte est indispensable à la correction
async fn extract_required(ctx: &CorrectionContext, path: &str) -> Result<String> {
    let text = ctx
        .hybrid
        .extract_document(Path::new(path), EngineMode::Auto)
        .await
        .map_err(|e| anyhow::anyhow!("extraction de {path}: {e}"))?;
    if text.trim().is_empty() {
        return Err(CorrectionError::ExtractionFailed {
            document: path.to_string(),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentRef, SessionStatus};

    #[tokio::test]
    async fn test_missing_epreuve_is_fatal() {
        let config = Config {
            groq_api_key: "clé-de-test".to_string(),
            ..Config::default()
        };
        let ctx = CorrectionContext::new(&config).unwrap();

        let mut session = Session::new("s1");
        session.status = SessionStatus::ReadyToCorrect;
        session.correction = Some(DocumentRef {
            filename: "correction.pdf".to_string(),
            path: "/tmp/correction.pdf".to_string(),
        });

        let result = run_correction(&session, &ctx).await;
        assert!(matches!(
            result,
            Err(CorrectionError::MissingDocument("épreuve"))
        ));
    }

    #[test]
    fn test_context_requires_api_key() {
        let config = Config::default();
        assert!(CorrectionContext::new(&config).is_err());
    }
}
