//! Regroupement des pages par élève - couche orchestration
//!
//! Un lot scanné contient les copies de plusieurs élèves à la suite.
//! Chaque page est attribuée à l'élève dont le nom figure en tête ; les
//! pages sans en-tête sont rattachées au dernier élève identifié, une
//! réponse s'étalant couramment sur plusieurs pages.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{CorrectionError, Result};
use crate::models::StudentCopy;
use crate::services::hybrid_extract::{EngineMode, HybridExtractor};
use crate::services::identity::{Identity, IdentityExtractor, UNKNOWN_CLASS};

/// Séparateur entre les pages d'une même copie reconstituée
pub const COPY_PAGE_JOIN: &str = "\n\n--- NOUVELLE PAGE ---\n\n";

/// Page d'un lot, numérotée à partir de 1
#[derive(Debug, Clone, PartialEq)]
pub struct BundlePage {
    pub page_num: usize,
    pub texte: String,
}

/// Pages d'un même élève, dans l'ordre du lot
#[derive(Debug, Clone, PartialEq)]
pub struct StudentGroup {
    pub identity: Identity,
    pub pages: Vec<BundlePage>,
}

impl StudentGroup {
    /// Reconstitue la copie : texte complet et pages d'origine
    pub fn into_copy(self) -> StudentCopy {
        let texte_complet = self
            .pages
            .iter()
            .map(|p| p.texte.as_str())
            .collect::<Vec<_>>()
            .join(COPY_PAGE_JOIN);
        StudentCopy {
            nom_eleve: self.identity.nom,
            classe: self.identity.classe,
            texte_complet,
            pages_sources: self.pages.into_iter().map(|p| p.page_num).collect(),
        }
    }
}

/// Regroupe les pages d'un lot par élève, dans l'ordre de première
/// apparition.
///
/// Les pages en tête de lot sans en-tête détectable reçoivent une
/// identité de substitution plutôt que d'être écartées : perdre
/// silencieusement le travail d'un élève n'est pas acceptable.
pub async fn group_pages(
    page_texts: &[String],
    extractor: &dyn IdentityExtractor,
) -> Vec<StudentGroup> {
    let mut groups: Vec<StudentGroup> = Vec::new();
    let mut current: Option<usize> = None;

    for (i, texte) in page_texts.iter().enumerate() {
        let page_num = i + 1;
        let identity = extractor.extract(texte).await;

        if !identity.is_unknown() {
            // nouvelle copie, ou retour à un élève déjà vu
            let idx = groups.iter().position(|g| g.identity == identity);
            current = Some(match idx {
                Some(idx) => idx,
                None => {
                    groups.push(StudentGroup {
                        identity: identity.clone(),
                        pages: Vec::new(),
                    });
                    groups.len() - 1
                }
            });
        }

        let idx = match current {
            Some(idx) => idx,
            None => {
                warn!(
                    "⚠️ Page {} sans élève identifiable, identité de substitution créée",
                    page_num
                );
                groups.push(StudentGroup {
                    identity: Identity {
                        nom: format!("Eleve non identifie (page {page_num})"),
                        classe: UNKNOWN_CLASS.to_string(),
                    },
                    pages: Vec::new(),
                });
                let idx = groups.len() - 1;
                current = Some(idx);
                idx
            }
        };

        groups[idx].pages.push(BundlePage {
            page_num,
            texte: texte.clone(),
        });
        info!(
            "  - Page {} attribuée à {}",
            page_num, groups[idx].identity.nom
        );
    }

    info!("✅ Découpage terminé: {} élève(s) détecté(s)", groups.len());
    groups
}

/// Extrait le texte d'un lot scanné puis regroupe ses pages par élève
pub async fn group_bundle(
    bundle_path: &Path,
    hybrid: &HybridExtractor,
    extractor: &dyn IdentityExtractor,
) -> Result<Vec<StudentCopy>> {
    info!(
        "📖 Découpage du fichier de copies: {}",
        bundle_path.display()
    );

    let page_texts = hybrid
        .extract_pages(bundle_path, EngineMode::Auto)
        .await
        .map_err(|e| anyhow::anyhow!("extraction du lot: {e}"))?;

    if page_texts.iter().all(|p| p.trim().is_empty()) {
        return Err(CorrectionError::ExtractionFailed {
            document: bundle_path.display().to_string(),
        });
    }

    let groups = group_pages(&page_texts, extractor).await;
    Ok(groups.into_iter().map(StudentGroup::into_copy).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity::RegexIdentityExtractor;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_carry_forward_grouping() {
        let page_texts = pages(&[
            "Nom: Alice Martin\nExercice 1: ...",
            "suite de l'exercice 1, sans en-tête",
            "Nom: Bob Durand\nExercice 1: ...",
        ]);

        let groups = group_pages(&page_texts, &RegexIdentityExtractor).await;

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].identity.nom, "Alice Martin");
        assert_eq!(
            groups[0].pages.iter().map(|p| p.page_num).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(groups[1].identity.nom, "Bob Durand");
        assert_eq!(groups[1].pages[0].page_num, 3);
    }

    #[tokio::test]
    async fn test_leading_page_without_header_gets_placeholder() {
        let page_texts = pages(&[
            "page orpheline, aucun en-tête 123",
            "Nom: Alice Martin\nExercice 1: ...",
        ]);

        let groups = group_pages(&page_texts, &RegexIdentityExtractor).await;

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].identity.nom, "Eleve non identifie (page 1)");
        assert_eq!(groups[0].identity.classe, UNKNOWN_CLASS);
        assert_eq!(groups[1].identity.nom, "Alice Martin");
    }

    #[tokio::test]
    async fn test_group_insertion_order_is_preserved() {
        let page_texts = pages(&[
            "Nom: Zoé Petit\n...",
            "Nom: Alice Martin\n...",
            "Nom: Zoé Petit\npage tardive",
        ]);

        let groups = group_pages(&page_texts, &RegexIdentityExtractor).await;

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].identity.nom, "Zoé Petit");
        assert_eq!(
            groups[0].pages.iter().map(|p| p.page_num).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(groups[1].identity.nom, "Alice Martin");
    }

    #[test]
    fn test_into_copy_joins_pages_with_marker() {
        let group = StudentGroup {
            identity: Identity {
                nom: "Alice Martin".to_string(),
                classe: "3B".to_string(),
            },
            pages: vec![
                BundlePage {
                    page_num: 1,
                    texte: "première page".to_string(),
                },
                BundlePage {
                    page_num: 2,
                    texte: "seconde page".to_string(),
                },
            ],
        };

        let copy = group.into_copy();
        assert_eq!(copy.nom_eleve, "Alice Martin");
        assert_eq!(copy.pages_sources, vec![1, 2]);
        assert_eq!(
            copy.texte_complet,
            "première page\n\n--- NOUVELLE PAGE ---\n\nseconde page"
        );
    }
}
