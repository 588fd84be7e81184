//! # Correction de copies
//!
//! Correction automatique de copies d'examen scannées : OCR hybride,
//! regroupement des pages par élève, extraction du barème, découpage des
//! réponses et notation question par question par un modèle de langage.
//!
//! ## Architecture
//!
//! Le système suit une architecture en quatre couches :
//!
//! ### ① Clients (accès externes)
//! - `clients/` - encapsulent les services distants, sans logique métier
//! - `AiGateway` - appels aux fournisseurs de modèles (Groq, Gemini), relance sur limite de débit
//! - `OcrSpaceClient` - service OCR en ligne pour le manuscrit
//!
//! ### ② Capacités (services)
//! - `services/` - chaque service décrit une aptitude, sans connaître le flux
//! - `HybridExtractor` - choix OCR local/cloud par détection imprimé/manuscrit
//! - `RubricExtractor` - barème à trois niveaux de repli + filtre de plausibilité
//! - `AnswerSegmenter` - découpage des réponses à trois niveaux de repli
//! - `AiGrader` - notation d'une seule question
//! - `UsageTracker` / `OcrQuota` - comptabilité d'usage et quota mensuel
//!
//! ### ③ Workflow
//! - `workflow/` - la notation complète d'une copie : pool borné, isolation
//!   des échecs, résultats dans l'ordre du barème
//!
//! ### ④ Orchestration
//! - `orchestrator/bundle` - regroupement des pages d'un lot par élève
//! - `orchestrator/correction` - les cinq étapes d'une correction de session
//!
//! ## Structure des modules

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// Réexports des types d'usage courant
pub use clients::{AiGateway, OcrSpaceClient, Provider};
pub use config::Config;
pub use error::{CorrectionError, GatewayError, OcrError, Result};
pub use models::{
    AnswerMap, Category, CopyOutcome, GradingResult, QuestionResult, Rubric, Session,
    SessionStatus, SessionStore, StudentCopy,
};
pub use orchestrator::{group_bundle, run_correction, CorrectionContext};
pub use services::{AnswerSegmenter, HybridExtractor, RubricExtractor, UsageTracker};
pub use workflow::{grade_copy, workers_for};
