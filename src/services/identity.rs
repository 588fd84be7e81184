//! Identification de l'élève - couche capacité
//!
//! Retrouve le nom et la classe en tête d'une page de copie. Deux niveaux :
//! extraction par le modèle, puis repli sur des expressions régulières et
//! heuristiques de première ligne. Toujours infaillible : au pire, l'élève
//! est marqué inconnu.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clients::AiGateway;
use crate::services::usage::{Stage, UsageTracker};
use crate::utils::text::truncate_chars;

pub const UNKNOWN_NAME: &str = "Eleve inconnu";
pub const UNKNOWN_CLASS: &str = "Classe inconnue";

/// Longueur d'en-tête soumise au modèle : le nom figure en tête de page
const HEADER_CHARS: usize = 300;

/// Identité relevée sur une page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub nom: String,
    pub classe: String,
}

impl Identity {
    pub fn unknown() -> Self {
        Self {
            nom: UNKNOWN_NAME.to_string(),
            classe: UNKNOWN_CLASS.to_string(),
        }
    }

    /// Aucun nom d'élève n'a pu être relevé
    pub fn is_unknown(&self) -> bool {
        self.nom == UNKNOWN_NAME
    }
}

/// Extracteur d'identité en tête de page
#[async_trait]
pub trait IdentityExtractor: Send + Sync {
    async fn extract(&self, page_text: &str) -> Identity;
}

/// Extracteur IA avec repli regex
pub struct AiIdentityExtractor {
    gateway: Arc<AiGateway>,
    usage: Arc<UsageTracker>,
}

#[derive(Debug, Deserialize)]
struct IdentityPayload {
    #[serde(default)]
    nom: String,
    #[serde(default)]
    classe: String,
}

impl AiIdentityExtractor {
    pub fn new(gateway: Arc<AiGateway>, usage: Arc<UsageTracker>) -> Self {
        Self { gateway, usage }
    }

    async fn llm_identity(&self, header: &str) -> Option<Identity> {
        let prompt = format!(
            r#"Voici le début d'une copie d'examen. Identifie le nom de l'élève et sa classe.

Texte:
---
{header}
---

Réponds UNIQUEMENT avec un objet JSON de la forme:
{{"nom": "Prénom Nom", "classe": "..."}}

Si une information est absente, mets "{UNKNOWN_NAME}" ou "{UNKNOWN_CLASS}"."#
        );

        let response = match self.gateway.generate_with_retry(&prompt, None, true).await {
            Ok(response) => response,
            Err(e) => {
                warn!("👤 Extraction IA du nom échouée: {}", e);
                return None;
            }
        };
        self.usage.record(Stage::NameExtraction, &prompt, &response);

        let cleaned = crate::utils::text::strip_code_fences(&response);
        let payload: IdentityPayload = serde_json::from_str(cleaned).ok()?;

        let nom = payload.nom.trim();
        if nom.is_empty() || nom == UNKNOWN_NAME {
            return None;
        }
        let classe = payload.classe.trim();
        Some(Identity {
            nom: nom.to_string(),
            classe: if classe.is_empty() {
                UNKNOWN_CLASS.to_string()
            } else {
                classe.to_string()
            },
        })
    }
}

#[async_trait]
impl IdentityExtractor for AiIdentityExtractor {
    async fn extract(&self, page_text: &str) -> Identity {
        let header = truncate_chars(page_text, HEADER_CHARS);

        if let Some(identity) = self.llm_identity(header).await {
            debug!("👤 Identité trouvée par le modèle: {}", identity.nom);
            return identity;
        }

        let identity = regex_identity(header);
        if !identity.is_unknown() {
            debug!("👤 Identité trouvée par regex: {}", identity.nom);
        }
        identity
    }
}

/// Extracteur purement regex, sans appel IA
pub struct RegexIdentityExtractor;

#[async_trait]
impl IdentityExtractor for RegexIdentityExtractor {
    async fn extract(&self, page_text: &str) -> Identity {
        regex_identity(truncate_chars(page_text, HEADER_CHARS))
    }
}

/// Relève le nom et la classe par motifs « Nom : ... » / « Classe : ... »,
/// avec repli sur la première ligne si elle ressemble à un nom complet.
pub(crate) fn regex_identity(header: &str) -> Identity {
    let mut nom = Regex::new(r"(?i)Nom\s*[:\-]\s*([A-Za-zÉÈÀÂÎÔÛéèàâîôûçÇ' -]{3,})")
        .ok()
        .and_then(|re| re.captures(header).and_then(|c| c.get(1).map(|m| m.as_str())))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    // Repli: première ligne non vide ressemblant à « Prénom Nom »
    if nom.is_none() {
        if let Some(first_line) = header.lines().map(str::trim).find(|l| !l.is_empty()) {
            let words: Vec<&str> = first_line.split_whitespace().collect();
            let looks_like_name = words.len() >= 2
                && words.len() <= 4
                && words.iter().all(|w| {
                    w.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-')
                });
            if looks_like_name {
                nom = Some(first_line.to_string());
            }
        }
    }

    let classe = Regex::new(r"(?i)Classe\s*[:\-]\s*([A-Za-z0-9][A-Za-z0-9\- _]*)")
        .ok()
        .and_then(|re| re.captures(header).and_then(|c| c.get(1).map(|m| m.as_str())))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| UNKNOWN_CLASS.to_string());

    Identity {
        nom: nom.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        classe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_identity_labeled_header() {
        let header = "Nom : Marie Dupont\nClasse : Terminale S2\n\nExercice 1...";
        let identity = regex_identity(header);
        assert_eq!(identity.nom, "Marie Dupont");
        assert_eq!(identity.classe, "Terminale S2");
        assert!(!identity.is_unknown());
    }

    #[test]
    fn test_regex_identity_first_line_heuristic() {
        let header = "Jean-Luc Martin\n\nExercice 1: la réponse est 42";
        let identity = regex_identity(header);
        assert_eq!(identity.nom, "Jean-Luc Martin");
        assert_eq!(identity.classe, UNKNOWN_CLASS);
    }

    #[test]
    fn test_regex_identity_no_header() {
        let header = "suite du calcul de la question 3: x = 12";
        let identity = regex_identity(header);
        assert!(identity.is_unknown());
        assert_eq!(identity.classe, UNKNOWN_CLASS);
    }

    #[test]
    fn test_first_line_with_digits_is_not_a_name() {
        let header = "Exercice 1\nla suite...";
        let identity = regex_identity(header);
        assert!(identity.is_unknown());
    }

    #[tokio::test]
    async fn test_regex_extractor_trait_object() {
        let extractor: Box<dyn IdentityExtractor> = Box::new(RegexIdentityExtractor);
        let identity = extractor.extract("Nom: Ali Ben Salah\nClasse: 3B").await;
        assert_eq!(identity.nom, "Ali Ben Salah");
        assert_eq!(identity.classe, "3B");
    }
}
