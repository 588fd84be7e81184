//! Structures de résultat de notation.
//!
//! Le format de sérialisation (noms de champs français) est le contrat de
//! sortie du pipeline : il est consommé tel quel par les clients.

use serde::{Deserialize, Serialize};

/// Catégorie qualitative d'une réponse notée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "REUSSIE")]
    Success,
    #[serde(rename = "PARTIELLE")]
    Partial,
    #[serde(rename = "RATEE")]
    Failed,
    #[default]
    #[serde(rename = "ERREUR")]
    Error,
}

/// Résultat détaillé de la notation d'une question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    #[serde(default)]
    pub points_obtenus: f64,
    #[serde(default)]
    pub categorie: Category,
    #[serde(default)]
    pub annotation_courte: String,
    #[serde(default)]
    pub feedback_detaille: String,
    #[serde(default)]
    pub conseil_revision: String,
    #[serde(default)]
    pub elements_corrects: Vec<String>,
    #[serde(default)]
    pub elements_manquants: Vec<String>,
    #[serde(default)]
    pub erreurs_detectees: Vec<String>,
}

impl GradingResult {
    /// Résultat à zéro point produit lorsqu'une question échoue techniquement.
    /// L'échec reste isolé : les autres questions de la copie sont notées.
    pub fn technical_error(message: &str) -> Self {
        Self {
            points_obtenus: 0.0,
            categorie: Category::Error,
            annotation_courte: "Erreur technique".to_string(),
            feedback_detaille: format!(
                "Une erreur technique a empêché la notation de cette question: {message}"
            ),
            conseil_revision: "Veuillez signaler ce problème à votre enseignant.".to_string(),
            ..Default::default()
        }
    }
}

/// Résultat d'une question, aplati dans la sortie finale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question: String,
    #[serde(flatten)]
    pub resultat: GradingResult,
}

/// Issue de la correction d'une copie : notée, ou en échec global
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CopyOutcome {
    Graded {
        nom_eleve: String,
        classe: String,
        note_finale: f64,
        note_maximale: f64,
        details: Vec<QuestionResult>,
    },
    Failed {
        nom_eleve: String,
        classe: String,
        erreur: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_wire_names() {
        let json = serde_json::to_string(&Category::Partial).unwrap();
        assert_eq!(json, "\"PARTIELLE\"");
        let back: Category = serde_json::from_str("\"RATEE\"").unwrap();
        assert_eq!(back, Category::Failed);
    }

    #[test]
    fn grading_result_tolerates_missing_fields() {
        let partial = r#"{"points_obtenus": 2.5, "categorie": "PARTIELLE"}"#;
        let result: GradingResult = serde_json::from_str(partial).unwrap();
        assert_eq!(result.points_obtenus, 2.5);
        assert_eq!(result.categorie, Category::Partial);
        assert!(result.elements_corrects.is_empty());
        assert!(result.annotation_courte.is_empty());
    }

    #[test]
    fn technical_error_is_zero_point_erreur() {
        let result = GradingResult::technical_error("timeout");
        assert_eq!(result.points_obtenus, 0.0);
        assert_eq!(result.categorie, Category::Error);
        assert!(result.feedback_detaille.contains("timeout"));
    }

    #[test]
    fn question_result_flattens_grading_fields() {
        let qr = QuestionResult {
            question: "Exercice 1".to_string(),
            resultat: GradingResult {
                points_obtenus: 5.0,
                categorie: Category::Success,
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&qr).unwrap();
        assert_eq!(value["question"], "Exercice 1");
        assert_eq!(value["points_obtenus"], 5.0);
        assert_eq!(value["categorie"], "REUSSIE");
        assert!(value.get("resultat").is_none());
    }
}
