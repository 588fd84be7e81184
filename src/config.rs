/// Configuration de l'application
#[derive(Clone, Debug)]
pub struct Config {
    // --- Fournisseur d'IA générative ---
    /// Fournisseur à utiliser : "groq" ou "gemini"
    pub ai_provider: String,
    pub groq_api_key: String,
    pub groq_api_base_url: String,
    pub groq_model_name: String,
    pub gemini_api_key: String,
    pub gemini_api_base_url: String,
    pub gemini_model_name: String,
    /// Nombre maximum de tentatives en cas de rate limit
    pub max_retries: usize,
    // --- OCR ---
    pub ocrspace_api_key: String,
    /// Quota mensuel de requêtes OCR.space
    pub ocrspace_monthly_limit: u64,
    /// Fichier de persistance du compteur mensuel
    pub ocr_usage_file: String,
    pub tesseract_path: String,
    pub pdftoppm_path: String,
    /// Résolution de rasterisation des PDF
    pub render_dpi: u32,
    /// Seuil de confiance au-delà duquel un document est considéré imprimé
    pub printed_confidence_threshold: f64,
    // --- Divers ---
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_provider: "groq".to_string(),
            groq_api_key: String::new(),
            groq_api_base_url: "https://api.groq.com/openai/v1".to_string(),
            groq_model_name: "llama-3.1-8b-instant".to_string(),
            gemini_api_key: String::new(),
            gemini_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai"
                .to_string(),
            gemini_model_name: "gemini-1.5-flash-latest".to_string(),
            max_retries: 3,
            ocrspace_api_key: "K87899142388957".to_string(),
            ocrspace_monthly_limit: 25_000,
            ocr_usage_file: "ocr_usage.toml".to_string(),
            tesseract_path: "tesseract".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            render_dpi: 300,
            printed_confidence_threshold: 75.0,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            ai_provider: std::env::var("AI_PROVIDER").unwrap_or(default.ai_provider),
            groq_api_key: std::env::var("GROQ_API_KEY").unwrap_or(default.groq_api_key),
            groq_api_base_url: std::env::var("GROQ_API_BASE_URL").unwrap_or(default.groq_api_base_url),
            groq_model_name: std::env::var("GROQ_MODEL_NAME").unwrap_or(default.groq_model_name),
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or(default.gemini_api_key),
            gemini_api_base_url: std::env::var("GEMINI_API_BASE_URL").unwrap_or(default.gemini_api_base_url),
            gemini_model_name: std::env::var("GEMINI_MODEL_NAME").unwrap_or(default.gemini_model_name),
            max_retries: std::env::var("AI_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_retries),
            ocrspace_api_key: std::env::var("OCRSPACE_API_KEY").unwrap_or(default.ocrspace_api_key),
            ocrspace_monthly_limit: std::env::var("OCRSPACE_MONTHLY_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.ocrspace_monthly_limit),
            ocr_usage_file: std::env::var("OCR_USAGE_FILE").unwrap_or(default.ocr_usage_file),
            tesseract_path: std::env::var("TESSERACT_PATH").unwrap_or(default.tesseract_path),
            pdftoppm_path: std::env::var("PDFTOPPM_PATH").unwrap_or(default.pdftoppm_path),
            render_dpi: std::env::var("RENDER_DPI").ok().and_then(|v| v.parse().ok()).unwrap_or(default.render_dpi),
            printed_confidence_threshold: std::env::var("PRINTED_CONFIDENCE_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.printed_confidence_threshold),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}
