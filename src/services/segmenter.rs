//! Découpage des réponses par question - couche capacité
//!
//! Associe chaque portion du texte d'une copie à la question du barème
//! correspondante. Trois niveaux de repli : le modèle, un découpage
//! positionnel par regex, puis l'affectation du texte entier à la
//! première question. Un niveau n'est retenu que s'il localise au moins
//! une réponse réelle.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::clients::AiGateway;
use crate::error::Result;
use crate::models::{AnswerMap, Rubric, NO_ANSWER_SENTINEL};
use crate::services::usage::{Stage, UsageTracker};
use crate::utils::text::{strip_code_fences, truncate_chars};

/// Niveau de repli ayant produit le découpage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentTier {
    /// Découpage par le modèle
    Generative,
    /// Découpage positionnel sur les intitulés du barème
    Positional,
    /// Texte entier affecté à la première question
    WholeText,
}

/// Découpage obtenu, avec le niveau qui l'a produit
#[derive(Debug, Clone)]
pub struct SegmentedAnswers {
    pub answers: AnswerMap,
    pub tier: SegmentTier,
}

/// Longueur de copie soumise au modèle
const PROMPT_CHARS: usize = 1500;

/// Découpeur de réponses
pub struct AnswerSegmenter {
    gateway: Arc<AiGateway>,
    usage: Arc<UsageTracker>,
}

impl AnswerSegmenter {
    pub fn new(gateway: Arc<AiGateway>, usage: Arc<UsageTracker>) -> Self {
        Self { gateway, usage }
    }

    /// Découpe le texte d'un document selon le barème.
    ///
    /// Le résultat porte exactement les clés du barème ; les questions
    /// sans réponse localisée portent le marqueur « aucune réponse ».
    pub async fn segment(&self, document_text: &str, rubric: &Rubric) -> SegmentedAnswers {
        if rubric.is_empty() {
            warn!("⚠️ Barème vide, rien à découper");
            return SegmentedAnswers {
                answers: AnswerMap::new(),
                tier: SegmentTier::WholeText,
            };
        }

        // Niveau 1 : le modèle
        match self.llm_segment(document_text, rubric).await {
            Ok(answers) if answers.non_sentinel_count() > 0 => {
                debug!(
                    "🤖 Découpage IA: {} réponse(s) localisée(s)",
                    answers.non_sentinel_count()
                );
                return SegmentedAnswers {
                    answers,
                    tier: SegmentTier::Generative,
                };
            }
            Ok(_) => warn!("⚠️ Découpage IA sans réponse localisée, passage au repli regex"),
            Err(e) => warn!("⚠️ Découpage IA échoué ({}), passage au repli regex", e),
        }

        // Niveau 2 : découpage positionnel
        let answers = positional_segment(document_text, rubric);
        if answers.non_sentinel_count() > 0 {
            debug!(
                "🔧 Découpage regex: {} réponse(s) localisée(s)",
                answers.non_sentinel_count()
            );
            return SegmentedAnswers {
                answers,
                tier: SegmentTier::Positional,
            };
        }

        // Niveau 3 : tout dans la première question
        warn!("⚠️ Dernier repli: texte entier affecté à la première question");
        SegmentedAnswers {
            answers: whole_text_segment(document_text, rubric),
            tier: SegmentTier::WholeText,
        }
    }

    async fn llm_segment(&self, document_text: &str, rubric: &Rubric) -> Result<AnswerMap> {
        let label_list = rubric
            .iter()
            .map(|(label, points)| format!("- {label} ({points} pts)"))
            .collect::<Vec<_>>()
            .join("\n");
        let head = truncate_chars(document_text, PROMPT_CHARS);

        let prompt = format!(
            r#"Découpe la copie en associant chaque partie à la bonne question.

QUESTIONS ATTENDUES :
{label_list}

⚠️ UTILISE UNIQUEMENT CES CLÉS (pas d'invention)

COPIE :
{head}...

SORTIE JSON :
{{
  "Exercice 1": "<texte réponse>",
  "Exercice 2": "<texte réponse>"
}}

Si question absente : "{NO_ANSWER_SENTINEL}"
"#
        );

        let response = self.gateway.generate_with_retry(&prompt, None, true).await?;
        self.usage.record(Stage::Segmentation, &prompt, &response);

        let cleaned = strip_code_fences(&response);
        let value: Value = serde_json::from_str(cleaned)
            .map_err(|e| anyhow::anyhow!("réponse de découpage illisible: {e}"))?;
        let Value::Object(map) = value else {
            return Err(anyhow::anyhow!("la réponse de découpage n'est pas un objet").into());
        };

        let mut answers = AnswerMap::new();
        for (label, text) in &map {
            if let Some(text) = text.as_str() {
                answers.insert(label.clone(), text.trim());
            }
        }
        // clés inventées retirées, clés manquantes complétées
        answers.align_to(rubric);
        Ok(answers)
    }
}

/// Motif souple pour un intitulé : « Exercice 1 » matche aussi « Exercice1 »
fn label_pattern(label: &str) -> Option<Regex> {
    let escaped = regex::escape(label).replace(' ', r"\s*");
    Regex::new(&format!("(?i){escaped}")).ok()
}

/// Trie les intitulés par leur composante numérique
fn labels_by_number(rubric: &Rubric) -> Vec<&str> {
    let num_re = Regex::new(r"\d+").ok();
    let mut labels: Vec<&str> = rubric.labels().collect();
    labels.sort_by_key(|label| {
        num_re
            .as_ref()
            .and_then(|re| re.find(label))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    });
    labels
}

/// Niveau 2 : la réponse d'une question est le texte entre son intitulé
/// et l'intitulé suivant (ou la fin du document).
fn positional_segment(document_text: &str, rubric: &Rubric) -> AnswerMap {
    let labels = labels_by_number(rubric);

    let mut answers = AnswerMap::new();
    for (i, label) in labels.iter().enumerate() {
        let Some(re) = label_pattern(label) else {
            answers.insert(*label, NO_ANSWER_SENTINEL);
            continue;
        };
        let Some(found) = re.find(document_text) else {
            answers.insert(*label, NO_ANSWER_SENTINEL);
            continue;
        };

        let start = found.end();
        let rest = &document_text[start..];
        let end = labels
            .get(i + 1)
            .and_then(|next| label_pattern(next))
            .and_then(|next_re| next_re.find(rest))
            .map(|m| m.start())
            .unwrap_or(rest.len());

        answers.insert(*label, rest[..end].trim());
    }

    // ordre canonique du barème en sortie
    answers.align_to(rubric);
    answers
}

/// Niveau 3 : texte entier sur la première question, marqueur partout ailleurs
fn whole_text_segment(document_text: &str, rubric: &Rubric) -> AnswerMap {
    let mut answers = AnswerMap::new();
    for (i, label) in rubric.labels().enumerate() {
        if i == 0 {
            answers.insert(label, document_text);
        } else {
            answers.insert(label, NO_ANSWER_SENTINEL);
        }
    }
    answers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric_of(entries: &[(&str, f64)]) -> Rubric {
        entries
            .iter()
            .map(|(l, p)| (l.to_string(), *p))
            .collect()
    }

    #[test]
    fn test_positional_segment_splits_between_labels() {
        let rubric = rubric_of(&[("Exercice 1", 10.0), ("Exercice 2", 10.0)]);
        let text = "Exercice 1\nma première réponse\nExercice 2\nma seconde réponse";

        let answers = positional_segment(text, &rubric);
        assert_eq!(answers.get("Exercice 1"), Some("ma première réponse"));
        assert_eq!(answers.get("Exercice 2"), Some("ma seconde réponse"));
    }

    #[test]
    fn test_positional_segment_missing_label_gets_sentinel() {
        let rubric = rubric_of(&[("Exercice 1", 10.0), ("Exercice 2", 10.0)]);
        let text = "Exercice 1\nseule réponse présente";

        let answers = positional_segment(text, &rubric);
        assert_eq!(answers.get("Exercice 1"), Some("seule réponse présente"));
        assert_eq!(answers.get("Exercice 2"), Some(NO_ANSWER_SENTINEL));
    }

    #[test]
    fn test_positional_segment_tolerates_missing_space() {
        let rubric = rubric_of(&[("Exercice 1", 10.0)]);
        let text = "Exercice1: réponse collée";
        let answers = positional_segment(text, &rubric);
        assert_eq!(answers.get("Exercice 1"), Some(": réponse collée"));
    }

    #[test]
    fn test_positional_segment_is_deterministic() {
        let rubric = rubric_of(&[
            ("Question 2", 5.0),
            ("Question 1", 5.0),
            ("Question 3", 5.0),
        ]);
        let text = "Question 1 a\nQuestion 2 b\nQuestion 3 c";

        let first = positional_segment(text, &rubric);
        for _ in 0..5 {
            assert_eq!(positional_segment(text, &rubric), first);
        }
    }

    #[test]
    fn test_whole_text_segment() {
        let rubric = rubric_of(&[("Question 1", 5.0), ("Question 2", 5.0)]);
        let text = "tout le contenu de la copie";

        let answers = whole_text_segment(text, &rubric);
        assert_eq!(answers.get("Question 1"), Some(text));
        assert_eq!(answers.get("Question 2"), Some(NO_ANSWER_SENTINEL));
    }

    #[test]
    fn test_labels_by_number_orders_numerically() {
        let rubric = rubric_of(&[
            ("Exercice 10", 1.0),
            ("Exercice 2", 1.0),
            ("Exercice 1", 1.0),
        ]);
        assert_eq!(
            labels_by_number(&rubric),
            vec!["Exercice 1", "Exercice 2", "Exercice 10"]
        );
    }
}
