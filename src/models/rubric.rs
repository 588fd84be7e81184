//! Barème et découpage des réponses.
//!
//! Le barème est une association ordonnée libellé → points maximum. L'ordre
//! de première apparition dans le document source est l'ordre canonique
//! d'affichage et d'agrégation en aval ; les clés sont uniques.

use serde::Serialize;

/// Marqueur inséré lorsqu'aucune réponse n'a pu être localisée pour une question
pub const NO_ANSWER_SENTINEL: &str = "AUCUNE RÉPONSE FOURNIE.";

/// Texte de remplacement quand la correction de référence est introuvable
pub const NO_REFERENCE_SENTINEL: &str = "Correction de référence non trouvée.";

/// Barème : libellés de questions et points maximum, dans l'ordre d'apparition
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rubric {
    entries: Vec<(String, f64)>,
}

impl Rubric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insère une question. Une clé déjà présente n'est jamais écrasée.
    pub fn insert(&mut self, label: impl Into<String>, points: f64) {
        let label = label.into();
        if !self.contains(&label) {
            self.entries.push((label, points));
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(l, _)| l == label)
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, p)| *p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Libellés dans l'ordre canonique
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, p)| (l.as_str(), *p))
    }

    /// Somme des points du barème
    pub fn total_points(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    /// Conserve uniquement les questions satisfaisant le prédicat
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|(l, _)| keep(l));
    }
}

impl FromIterator<(String, f64)> for Rubric {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut rubric = Rubric::new();
        for (label, points) in iter {
            rubric.insert(label, points);
        }
        rubric
    }
}

/// Réponses découpées par question.
///
/// Après complétion des niveaux de repli, les clés sont exactement celles du
/// barème ; les questions sans réponse portent [`NO_ANSWER_SENTINEL`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnswerMap {
    entries: Vec<(String, String)>,
}

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, text: impl Into<String>) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, t)) => *t = text.into(),
            None => self.entries.push((label, text.into())),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, t)| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nombre de réponses réelles (hors marqueur « aucune réponse »)
    pub fn non_sentinel_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, t)| t != NO_ANSWER_SENTINEL)
            .count()
    }

    /// Supprime les clés absentes du barème, puis complète les clés
    /// manquantes avec le marqueur « aucune réponse ».
    pub fn align_to(&mut self, rubric: &Rubric) {
        self.entries.retain(|(l, _)| rubric.contains(l));
        for label in rubric.labels() {
            if self.get(label).is_none() {
                self.entries.push((label.to_string(), NO_ANSWER_SENTINEL.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rubric_preserves_insertion_order() {
        let mut rubric = Rubric::new();
        rubric.insert("Exercice 2", 8.0);
        rubric.insert("Exercice 1", 5.0);
        rubric.insert("Question 1", 3.0);

        let labels: Vec<&str> = rubric.labels().collect();
        assert_eq!(labels, vec!["Exercice 2", "Exercice 1", "Question 1"]);
        assert_eq!(rubric.total_points(), 16.0);
    }

    #[test]
    fn rubric_insert_never_overwrites() {
        let mut rubric = Rubric::new();
        rubric.insert("Exercice 1", 5.0);
        rubric.insert("Exercice 1", 99.0);

        assert_eq!(rubric.len(), 1);
        assert_eq!(rubric.get("Exercice 1"), Some(5.0));
    }

    #[test]
    fn align_to_drops_foreign_keys_and_fills_missing() {
        let rubric: Rubric = [("Exercice 1".to_string(), 10.0), ("Exercice 2".to_string(), 10.0)]
            .into_iter()
            .collect();

        let mut answers = AnswerMap::new();
        answers.insert("Exercice 1", "ma réponse");
        answers.insert("Question 42", "clé inventée par le modèle");

        answers.align_to(&rubric);

        assert_eq!(answers.len(), 2);
        assert_eq!(answers.get("Exercice 1"), Some("ma réponse"));
        assert_eq!(answers.get("Exercice 2"), Some(NO_ANSWER_SENTINEL));
        assert!(answers.get("Question 42").is_none());
    }
}
