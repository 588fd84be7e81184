//! Extraction du barème - couche capacité
//!
//! Trois niveaux de repli : le modèle, puis des expressions régulières sur
//! les conventions d'intitulé courantes, puis un barème forfaitaire déduit
//! du nombre d'exercices. Un filtre de plausibilité écarte ensuite les
//! questions vraisemblablement recopiées depuis la correction.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clients::AiGateway;
use crate::error::{CorrectionError, Result};
use crate::models::Rubric;
use crate::services::usage::{Stage, UsageTracker};
use crate::utils::text::{strip_code_fences, truncate_chars};

/// Niveau de repli ayant produit le barème
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RubricTier {
    /// Extraction par le modèle
    Generative,
    /// Motifs « Exercice N (P points) » et « TD N°x: Question N (P points) »
    Regex,
    /// Barème forfaitaire : 10 points par exercice, 5 par question
    HeuristicDefault,
}

/// Barème extrait, avec le niveau qui l'a produit
#[derive(Debug, Clone)]
pub struct ExtractedRubric {
    pub rubric: Rubric,
    pub tier: RubricTier,
}

/// Début du sujet soumis au modèle : les intitulés figurent en tête
const PROMPT_CHARS: usize = 1500;

/// Extracteur de barème
pub struct RubricExtractor {
    gateway: Arc<AiGateway>,
    usage: Arc<UsageTracker>,
}

impl RubricExtractor {
    pub fn new(gateway: Arc<AiGateway>, usage: Arc<UsageTracker>) -> Self {
        Self { gateway, usage }
    }

    /// Extrait puis filtre le barème du texte de l'épreuve.
    /// Échoue seulement si les trois niveaux ne produisent rien.
    pub async fn extract(&self, exam_text: &str) -> Result<ExtractedRubric> {
        info!("🤖 Extraction du barème...");

        // Niveau 1 : le modèle
        match self.llm_rubric(exam_text).await {
            Ok(rubric) if !rubric.is_empty() => {
                info!("✅ Barème extrait par le modèle: {} question(s)", rubric.len());
                return Ok(self.filter(ExtractedRubric {
                    rubric,
                    tier: RubricTier::Generative,
                }));
            }
            Ok(_) => warn!("⚠️ Le modèle n'a trouvé aucune question, passage au repli regex"),
            Err(e) => warn!("⚠️ Extraction IA échouée ({}), passage au repli regex", e),
        }

        // Niveau 2 : expressions régulières
        let rubric = regex_rubric(exam_text);
        if !rubric.is_empty() {
            info!("✅ Barème extrait par regex: {} question(s)", rubric.len());
            return Ok(self.filter(ExtractedRubric {
                rubric,
                tier: RubricTier::Regex,
            }));
        }

        // Niveau 3 : barème forfaitaire
        let rubric = default_rubric(exam_text);
        if !rubric.is_empty() {
            info!(
                "✅ Barème forfaitaire créé: {} question(s)",
                rubric.len()
            );
            return Ok(self.filter(ExtractedRubric {
                rubric,
                tier: RubricTier::HeuristicDefault,
            }));
        }

        Err(CorrectionError::RubricNotFound)
    }

    fn filter(&self, extracted: ExtractedRubric) -> ExtractedRubric {
        ExtractedRubric {
            rubric: apply_plausibility_filter(extracted.rubric),
            tier: extracted.tier,
        }
    }

    async fn llm_rubric(&self, exam_text: &str) -> Result<Rubric> {
        let prompt = build_rubric_prompt(exam_text);
        let response = self.gateway.generate_with_retry(&prompt, None, true).await?;
        self.usage.record(Stage::Rubric, &prompt, &response);

        let cleaned = strip_code_fences(&response);
        let value: Value = serde_json::from_str(cleaned)
            .map_err(|e| anyhow::anyhow!("réponse barème illisible: {e}"))?;
        let Value::Object(map) = value else {
            return Err(anyhow::anyhow!("la réponse barème n'est pas un objet").into());
        };

        // serde_json conserve l'ordre d'apparition (preserve_order)
        let mut rubric = Rubric::new();
        for (label, points) in &map {
            if let Some(points) = points.as_f64() {
                if points >= 0.0 {
                    rubric.insert(label.clone(), points);
                }
            }
        }
        Ok(rubric)
    }
}

fn build_rubric_prompt(exam_text: &str) -> String {
    let head = truncate_chars(exam_text, PROMPT_CHARS);
    format!(
        r#"Tu es un expert en analyse de sujets d'examen.

MISSION : Extraire UNIQUEMENT les questions/exercices du SUJET (pas de la correction).

━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
📄 DOCUMENT (premiers {PROMPT_CHARS} caractères)
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

{head}

━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
🔍 INSTRUCTIONS
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

1. **CHERCHE les patterns suivants :**
   - "Exercice 1 (5 points)"
   - "Question 1 (3 points)"
   - "TD N°1: Question 1 (4 points)"

2. **IGNORE tout après :**
   - "Solution correcte"
   - "Correction -"
   - "Barème détaillé"

3. **Si tu ne trouves RIEN :**
   - Retourne un objet vide : {{}}

━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
📤 FORMAT DE SORTIE (JSON STRICT)
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

{{
  "Exercice 1": 5,
  "Exercice 2": 8
}}

OU

{{
  "Question 1": 3,
  "Question 2": 4
}}

Si rien trouvé : {{}}
"#
    )
}

/// Niveau 2 : conventions « Exercice 1 (5 points) » et
/// « TD N°1: Question 1 (3 points) ». Les doublons ne sont pas écrasés.
fn regex_rubric(exam_text: &str) -> Rubric {
    let patterns = [
        r"(?i)(Exercice|Question)\s+(\d+)\s*\((\d+)\s*points?\)",
        r"(?i)(?:TD|TP)\s*N[°o]\s*\d+\s*:\s*(Question|Exercice)\s+(\d+)\s*\((\d+)\s*points?\)",
    ];

    let mut rubric = Rubric::new();
    for pattern in patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        for caps in re.captures_iter(exam_text) {
            let (Some(kind), Some(num), Some(points)) = (caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            let Ok(points) = points.as_str().parse::<f64>() else {
                continue;
            };
            let label = format!("{} {}", capitalize(kind.as_str()), num.as_str());
            rubric.insert(label, points);
        }
    }
    rubric
}

/// Niveau 3 : compte les exercices (10 points chacun), sinon les
/// questions (5 points chacune).
fn default_rubric(exam_text: &str) -> Rubric {
    let count = |pattern: &str| {
        Regex::new(pattern)
            .map(|re| re.find_iter(exam_text).count())
            .unwrap_or(0)
    };

    let mut rubric = Rubric::new();
    let exercise_count = count(r"(?i)Exercice\s+\d+");
    if exercise_count > 0 {
        for i in 1..=exercise_count {
            rubric.insert(format!("Exercice {i}"), 10.0);
        }
        return rubric;
    }
    for i in 1..=count(r"(?i)Question\s+\d+") {
        rubric.insert(format!("Question {i}"), 5.0);
    }
    rubric
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn is_exercise_label(label: &str) -> bool {
    label.contains("Exercice") || label.contains("Exo")
}

fn is_question_label(label: &str) -> bool {
    label.contains("Question") && !label.contains("Exercice")
}

/// Filtre de plausibilité du barème.
///
/// Un total bien au-delà de 25 points trahit généralement un barème
/// contaminé par les intitulés recopiés de la correction de référence ;
/// dans ce cas, si exercices et questions cohabitent, seule la famille
/// des exercices est conservée.
pub(crate) fn apply_plausibility_filter(rubric: Rubric) -> Rubric {
    let total: f64 = rubric.total_points();
    let exercise_count = rubric.labels().filter(|l| is_exercise_label(l)).count();
    let question_count = rubric.labels().filter(|l| is_question_label(l)).count();

    debug!(
        "🔍 Analyse du barème: {} question(s), {} points (Exercices: {}, Questions: {})",
        rubric.len(),
        total,
        exercise_count,
        question_count
    );

    if (18.0..=22.0).contains(&total) {
        info!("✅ Total proche de 20 points, barème conservé tel quel");
        return rubric;
    }
    if (8.0..=16.0).contains(&total) {
        info!("✅ Total de {} points, barème court conservé tel quel", total);
        return rubric;
    }
    if total > 25.0 && exercise_count > 0 && question_count > 0 {
        warn!(
            "⚠️ Total anormalement élevé ({} pts) avec mélange Exercices/Questions",
            total
        );
        let mut filtered = rubric.clone();
        filtered.retain(is_exercise_label);
        if filtered.is_empty() {
            warn!("⚠️ Le filtrage viderait le barème, conservation de tout");
            return rubric;
        }
        info!(
            "✅ Conservation des Exercices uniquement: {} question(s), {} points",
            filtered.len(),
            filtered.total_points()
        );
        return filtered;
    }

    rubric
}
