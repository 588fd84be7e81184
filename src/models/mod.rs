//! Modèles de données du pipeline de correction

pub mod grading;
pub mod rubric;
pub mod session;

pub use grading::{Category, CopyOutcome, GradingResult, QuestionResult};
pub use rubric::{AnswerMap, Rubric, NO_ANSWER_SENTINEL, NO_REFERENCE_SENTINEL};
pub use session::{
    DocumentRef, InMemorySessionStore, Session, SessionStatus, SessionStore, StudentCopy,
};
