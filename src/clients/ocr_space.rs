//! Client OCR.space - couche client
//!
//! Appelle le service OCR en ligne pour les documents manuscrits, où le
//! moteur local est insuffisant.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::OcrError;

const OCR_SPACE_ENDPOINT: &str = "https://api.ocr.space/parse/image";

#[derive(Debug, Deserialize)]
struct OcrSpaceResponse {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored: bool,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: String,
}

/// Client du service OCR.space
pub struct OcrSpaceClient {
    http: reqwest::Client,
    api_key: String,
}

impl OcrSpaceClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.ocrspace_api_key.clone(),
        }
    }

    /// Envoie un document au service et retourne le texte reconnu,
    /// une entrée par page, dans l'ordre du document.
    pub async fn parse_pages(&self, path: &Path) -> Result<Vec<String>, OcrError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let is_pdf = path
            .extension()
            .map(|e| e.to_ascii_lowercase() == "pdf")
            .unwrap_or(false);

        debug!("☁️ Envoi de '{}' au service OCR en ligne", filename);

        let bytes = tokio::fs::read(path).await?;

        let file_part = reqwest::multipart::Part::bytes(bytes).file_name(filename.clone());
        let mut form = reqwest::multipart::Form::new()
            .text("apikey", self.api_key.clone())
            .text("language", "fre")
            .text("isOverlayRequired", "false")
            .text("detectOrientation", "true")
            .text("scale", "true")
            .text("OCREngine", "2")
            .part("file", file_part);
        if is_pdf {
            form = form.text("isTable", "true");
        }

        let response = self
            .http
            .post(OCR_SPACE_ENDPOINT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OcrError::CloudService(format!("requête échouée: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OcrError::CloudService(format!(
                "le service a répondu {status}"
            )));
        }

        let parsed: OcrSpaceResponse = response
            .json()
            .await
            .map_err(|e| OcrError::CloudService(format!("réponse illisible: {e}")))?;

        if parsed.is_errored {
            let message = parsed.error_message.join("; ");
            warn!("☁️ Le service OCR a signalé une erreur: {}", message);
            return Err(OcrError::CloudService(message));
        }

        let pages: Vec<String> = parsed
            .parsed_results
            .iter()
            .map(|r| r.parsed_text.trim().to_string())
            .collect();

        debug!(
            "☁️ OCR en ligne terminé: {} page(s), {} caractères",
            pages.len(),
            pages.iter().map(|p| p.len()).sum::<usize>()
        );
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing_success() {
        let json = r#"{
            "ParsedResults": [
                {"ParsedText": "Nom: Dupont\nExercice 1: ..."},
                {"ParsedText": "Exercice 2: ..."}
            ],
            "IsErroredOnProcessing": false
        }"#;
        let parsed: OcrSpaceResponse = serde_json::from_str(json).unwrap();
        assert!(!parsed.is_errored);
        assert_eq!(parsed.parsed_results.len(), 2);
        assert!(parsed.parsed_results[0].parsed_text.contains("Dupont"));
    }

    #[test]
    fn test_response_parsing_error() {
        let json = r#"{
            "IsErroredOnProcessing": true,
            "ErrorMessage": ["File size exceeds limit"]
        }"#;
        let parsed: OcrSpaceResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.is_errored);
        assert_eq!(parsed.error_message[0], "File size exceeds limit");
    }
}
