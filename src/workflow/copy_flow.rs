//! Notation d'une copie - couche workflow
//!
//! Fait défiler les questions d'une copie sur un pool borné d'appels
//! concurrents, isole les échecs question par question et restitue les
//! résultats dans l'ordre canonique du barème.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::models::{
    GradingResult, QuestionResult, Rubric, NO_ANSWER_SENTINEL, NO_REFERENCE_SENTINEL,
};
use crate::models::AnswerMap;
use crate::services::grader::{GradingRequest, QuestionGrader};

/// Taille du pool de notation selon le nombre de questions.
///
/// Borne les appels sortants simultanés pour respecter les limites de
/// débit du fournisseur tout en parallélisant la latence.
pub fn workers_for(question_count: usize) -> usize {
    match question_count {
        0..=2 => question_count.max(1),
        3..=4 => 2,
        5..=10 => 3,
        _ => 4,
    }
}

/// Note toutes les questions d'une copie.
///
/// Retourne les résultats dans l'ordre du barème et la note finale
/// (somme des points obtenus, arrondie au centième). Un échec sur une
/// question produit un résultat ERREUR à zéro point sans toucher aux
/// autres questions.
pub async fn grade_copy(
    rubric: &Rubric,
    student_answers: &AnswerMap,
    reference_answers: &AnswerMap,
    grader: &dyn QuestionGrader,
) -> (Vec<QuestionResult>, f64) {
    let concurrency = workers_for(rubric.len());
    info!(
        "⚡ {} appel(s) concurrent(s) pour {} question(s)",
        concurrency,
        rubric.len()
    );

    let grading_futures = rubric.iter().map(|(label, max_points)| {
        let request = GradingRequest {
            question_label: label.to_string(),
            max_points,
            student_answer: student_answers
                .get(label)
                .unwrap_or(NO_ANSWER_SENTINEL)
                .to_string(),
            reference_answer: reference_answers
                .get(label)
                .unwrap_or(NO_REFERENCE_SENTINEL)
                .to_string(),
        };
        async move {
            let label = request.question_label.clone();
            let result = match grader.grade(&request).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("❌ Échec de notation de {} : {}", label, e);
                    GradingResult::technical_error(&e.to_string())
                }
            };
            (label, result)
        }
    });

    // collecte dans l'ordre d'achèvement, non déterministe
    let completed: Vec<(String, GradingResult)> = stream::iter(grading_futures)
        .buffer_unordered(concurrency)
        .collect()
        .await;

    // remise dans l'ordre canonique du barème
    let mut results = Vec::with_capacity(rubric.len());
    let mut total = 0.0;
    for label in rubric.labels() {
        if let Some((_, result)) = completed.iter().find(|(l, _)| l == label) {
            total += result.points_obtenus;
            results.push(QuestionResult {
                question: label.to_string(),
                resultat: result.clone(),
            });
        }
    }

    (results, (total * 100.0).round() / 100.0)
}
