//! Sessions de correction : documents déposés, copies regroupées, résultats.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{CorrectionError, Result};
use crate::models::grading::CopyOutcome;

/// État d'avancement d'une session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    #[serde(rename = "copies_deposees")]
    CopiesUploaded,
    #[serde(rename = "epreuve_deposee")]
    EpreuveUploaded,
    #[serde(rename = "prete_a_corriger")]
    ReadyToCorrect,
    #[serde(rename = "corrigee")]
    Corrected,
}

/// Référence vers un document déposé (sujet ou correction)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRef {
    pub filename: String,
    pub path: String,
}

/// Copie d'un élève : texte complet et pages d'origine dans le lot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentCopy {
    pub nom_eleve: String,
    pub classe: String,
    pub texte_complet: String,
    pub pages_sources: Vec<usize>,
}

/// Session de correction
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    pub epreuve: Option<DocumentRef>,
    pub correction: Option<DocumentRef>,
    pub copies: Vec<StudentCopy>,
    pub results: Option<Vec<CopyOutcome>>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::CopiesUploaded,
            epreuve: None,
            correction: None,
            copies: Vec::new(),
            results: None,
            created_at: Utc::now(),
        }
    }

    /// La session est corrigée : ses résultats sont figés
    pub fn is_corrected(&self) -> bool {
        self.status == SessionStatus::Corrected
    }
}

/// Stockage des sessions
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Session>;
    fn put(&self, session: Session) -> Result<()>;
    fn delete(&self, id: &str) -> Result<()>;
}

/// Stockage en mémoire, protégé par verrou
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &str) -> Result<Session> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("verrou du stockage de sessions empoisonné"))?;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| CorrectionError::SessionNotFound(id.to_string()))
    }

    fn put(&self, session: Session) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("verrou du stockage de sessions empoisonné"))?;
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("verrou du stockage de sessions empoisonné"))?;
        sessions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CorrectionError::SessionNotFound(id.to_string()))
    }
}
