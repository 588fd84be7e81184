//! Taxonomie d'erreurs du pipeline de correction.
//!
//! Les échecs fatals (`CorrectionError`) interrompent la correction et sont
//! renvoyés comme charge d'erreur unique ; les échecs isolés (question par
//! question) sont absorbés par l'orchestrateur et n'apparaissent jamais ici.

use thiserror::Error;

/// Erreur fatale d'une exécution de correction
#[derive(Debug, Error)]
pub enum CorrectionError {
    /// L'OCR n'a produit aucun texte exploitable pour un document entier
    #[error("impossible d'extraire le texte de {document}")]
    ExtractionFailed { document: String },

    /// Aucun barème plausible après tous les niveaux de repli
    #[error("impossible d'extraire un barème de l'épreuve")]
    RubricNotFound,

    /// La session ne référence pas le document requis
    #[error("document manquant dans la session : {0}")]
    MissingDocument(&'static str),

    #[error("session {0} introuvable")]
    SessionNotFound(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Erreur du client d'IA générative
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Limite de débit signalée par le fournisseur (réessayable)
    #[error("limite de débit atteinte : {message}")]
    RateLimited {
        message: String,
        /// Attente suggérée par le fournisseur, en secondes
        suggested_wait: Option<f64>,
    },

    /// Valeur de configuration inconnue pour le fournisseur d'IA
    #[error("fournisseur d'IA non reconnu : {0}")]
    UnknownProvider(String),

    #[error("clé API manquante pour {0}")]
    MissingApiKey(&'static str),

    #[error("réponse vide du modèle")]
    EmptyResponse,

    #[error("appel API échoué : {0}")]
    Api(String),
}

impl GatewayError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GatewayError::RateLimited { .. })
    }
}

/// Erreur de reconnaissance de texte (moteur local ou service cloud)
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("fichier introuvable : {0}")]
    FileNotFound(String),

    #[error("format non supporté : {0}")]
    UnsupportedFormat(String),

    #[error("échec de rasterisation du PDF : {0}")]
    RenderFailed(String),

    #[error("échec de décodage d'image : {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("erreur du moteur OCR local : {0}")]
    Engine(String),

    #[error("erreur OCR.space : {0}")]
    CloudService(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Résultat standard du crate
pub type Result<T, E = CorrectionError> = std::result::Result<T, E>;
