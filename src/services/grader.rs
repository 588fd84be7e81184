//! Notation d'une question - couche capacité
//!
//! Ne traite qu'une seule question à la fois : construction du prompt de
//! correction, appel du modèle, analyse tolérante de la réponse. La
//! parallélisation par copie relève de la couche workflow.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::clients::AiGateway;
use crate::error::Result;
use crate::models::GradingResult;
use crate::services::usage::{Stage, UsageTracker};
use crate::utils::text::strip_code_fences;

/// Question à noter : intitulé, réponses en regard, points en jeu
#[derive(Debug, Clone)]
pub struct GradingRequest {
    pub question_label: String,
    pub max_points: f64,
    pub student_answer: String,
    pub reference_answer: String,
}

/// Capacité de notation d'une question
#[async_trait]
pub trait QuestionGrader: Send + Sync {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult>;
}

/// Notation par le modèle
pub struct AiGrader {
    gateway: Arc<AiGateway>,
    usage: Arc<UsageTracker>,
}

impl AiGrader {
    pub fn new(gateway: Arc<AiGateway>, usage: Arc<UsageTracker>) -> Self {
        Self { gateway, usage }
    }
}

#[async_trait]
impl QuestionGrader for AiGrader {
    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult> {
        let prompt = build_grading_prompt(request);
        let response = self.gateway.generate_with_retry(&prompt, None, true).await?;
        self.usage.record(Stage::Grading, &prompt, &response);

        let cleaned = strip_code_fences(&response);
        // champs manquants remplacés par leurs valeurs par défaut, jamais
        // d'échec de l'appel pour une réponse incomplète
        let result: GradingResult = serde_json::from_str(cleaned)
            .map_err(|e| anyhow::anyhow!("réponse de notation illisible: {e}"))?;

        debug!(
            "✅ {} : {}/{} pts",
            request.question_label, result.points_obtenus, request.max_points
        );
        Ok(result)
    }
}

fn build_grading_prompt(request: &GradingRequest) -> String {
    let label = &request.question_label;
    let max = request.max_points;
    let framing = format!("Évaluation de la {label}");

    format!(
        r#"Tu es un professeur expert en correction de copies.

━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
📝 {label} ({max} points)
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

**Énoncé :** {framing}

**Correction attendue :** {reference}

**Réponse étudiant :** {student}

━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
🎯 BARÈME
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

- {max} pts : Réponse complète et correcte
- {p75:.1} pts : Correcte avec petites erreurs
- {p50:.1} pts : Partiellement correcte
- {p25:.1} pts : Très incomplète
- 0 pt : Incorrecte ou absente

━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
✅ CONSIGNES
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

**TOLÉRANCE :**
- Variantes de formulation (sens correct)
- Fautes d'orthographe
- Erreurs OCR ("NIM" = "N:M", "Maticule" = "Matricule")
- Différences de notation ("1:N" = "1..N")

**VALORISE :**
- Compréhension du concept
- Raisonnement valide

**RÈGLE D'OR :**
Si l'étudiant a compris le concept principal → au moins 50% des points

━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
📤 FORMAT DE SORTIE (JSON)
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

{{
  "points_obtenus": <nombre entre 0 et {max}>,
  "categorie": "REUSSIE" | "PARTIELLE" | "RATEE",
  "annotation_courte": "<feedback en 10-15 mots>",
  "feedback_detaille": "<ce qui est correct, ce qui manque, les erreurs>",
  "conseil_revision": "<conseil concret avec ressources>",
  "elements_corrects": ["<élément 1>", "<élément 2>"],
  "elements_manquants": ["<élément 1>", "<élément 2>"],
  "erreurs_detectees": ["<erreur 1>", "<erreur 2>"]
}}

**Exemples de conseils :**
- "Révisez les cardinalités : 1:N (un à plusieurs), N:M (plusieurs à plusieurs)"
- "Entraînez-vous avec CREATE TABLE : spécifiez PRIMARY KEY pour la clé"
- "Pour compter : utilisez COUNT() avec GROUP BY"
"#,
        reference = request.reference_answer,
        student = request.student_answer,
        p75 = max * 0.75,
        p50 = max * 0.5,
        p25 = max * 0.25,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn request() -> GradingRequest {
        GradingRequest {
            question_label: "Exercice 1".to_string(),
            max_points: 10.0,
            student_answer: "une clé primaire identifie une ligne".to_string(),
            reference_answer: "la clé primaire identifie de façon unique".to_string(),
        }
    }

    #[test]
    fn test_prompt_contains_point_ladder() {
        let prompt = build_grading_prompt(&request());
        assert!(prompt.contains("Exercice 1 (10 points)"));
        assert!(prompt.contains("- 7.5 pts"));
        assert!(prompt.contains("- 5.0 pts"));
        assert!(prompt.contains("- 2.5 pts"));
        assert!(prompt.contains("RÈGLE D'OR"));
        assert!(prompt.contains("Évaluation de la Exercice 1"));
    }

    #[test]
    fn test_fenced_response_parses_with_defaults() {
        let response = "```json\n{\"points_obtenus\": 7.5, \"categorie\": \"PARTIELLE\"}\n```";
        let result: GradingResult =
            serde_json::from_str(strip_code_fences(response)).unwrap();
        assert_eq!(result.points_obtenus, 7.5);
        assert_eq!(result.categorie, Category::Partial);
        assert!(result.feedback_detaille.is_empty());
        assert!(result.erreurs_detectees.is_empty());
    }
}
