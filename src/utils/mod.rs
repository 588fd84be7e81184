//! Utilitaires transverses

pub mod logging;
pub mod text;
