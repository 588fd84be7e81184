//! Passerelle IA - couche client
//!
//! Encapsule tous les appels aux fournisseurs de modèles (Groq, Gemini) via
//! leurs points d'accès compatibles OpenAI.
//!
//! ## Pile technique
//! - `async-openai` pour les appels API
//! - Point d'accès et modèle configurables par fournisseur
//! - Relance automatique sur limite de débit avec délai suggéré

use std::future::Future;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use regex::Regex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GatewayError;

/// Fournisseur de modèle pris en charge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    Gemini,
}

impl Provider {
    pub fn from_name(name: &str) -> Result<Self, GatewayError> {
        match name.to_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "gemini" => Ok(Provider::Gemini),
            other => Err(GatewayError::UnknownProvider(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::Gemini => "gemini",
        }
    }
}

/// Passerelle vers le fournisseur IA configuré
pub struct AiGateway {
    client: Client<OpenAIConfig>,
    provider: Provider,
    model_name: String,
    max_retries: usize,
}

impl AiGateway {
    /// Crée la passerelle pour le fournisseur désigné par la configuration
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let provider = Provider::from_name(&config.ai_provider)?;

        let (api_key, api_base, model_name) = match provider {
            Provider::Groq => (
                config.groq_api_key.as_str(),
                config.groq_api_base_url.as_str(),
                config.groq_model_name.clone(),
            ),
            Provider::Gemini => (
                config.gemini_api_key.as_str(),
                config.gemini_api_base_url.as_str(),
                config.gemini_model_name.clone(),
            ),
        };

        if api_key.is_empty() {
            return Err(GatewayError::MissingApiKey(match provider {
                Provider::Groq => "GROQ_API_KEY",
                Provider::Gemini => "GEMINI_API_KEY",
            }));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Ok(Self {
            client: Client::with_config(openai_config),
            provider,
            model_name,
            max_retries: config.max_retries,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Appel unique au modèle. Les erreurs de limite de débit sont
    /// identifiées pour permettre la relance en amont.
    ///
    /// # Paramètres
    /// - `user_message`: contenu du message utilisateur
    /// - `system_message`: message système (optionnel)
    /// - `json_output`: demander une réponse JSON structurée
    pub async fn generate(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        json_output: bool,
    ) -> Result<String, GatewayError> {
        debug!(
            "Appel du fournisseur {}, modèle: {}",
            self.provider.as_str(),
            self.model_name
        );
        debug!("Longueur du message utilisateur: {} caractères", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| GatewayError::Api(e.to_string()))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| GatewayError::Api(e.to_string()))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.3)
            .max_tokens(2048u32);

        // Gemini (point d'accès compatible OpenAI) ne prend pas en charge
        // response_format ; le mode JSON n'est demandé qu'à Groq.
        if json_output && self.provider == Provider::Groq {
            builder.response_format(ResponseFormat::JsonObject);
        }

        let request = builder
            .build()
            .map_err(|e| GatewayError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| classify_api_error(&e.to_string()))?;

        debug!("Appel API réussi");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or(GatewayError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }

    /// Appel avec relance automatique sur limite de débit
    pub async fn generate_with_retry(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        json_output: bool,
    ) -> Result<String, GatewayError> {
        call_with_rate_limit_retry(self.max_retries, || {
            self.generate(user_message, system_message, json_output)
        })
        .await
    }
}

/// Classe une erreur API : limite de débit ou erreur générique
fn classify_api_error(message: &str) -> GatewayError {
    let lowered = message.to_lowercase();
    if lowered.contains("rate_limit") || lowered.contains("429") {
        GatewayError::RateLimited {
            message: message.to_string(),
            suggested_wait: parse_suggested_wait(message),
        }
    } else {
        GatewayError::Api(message.to_string())
    }
}

/// Extrait le délai suggéré d'un message « Please try again in 7.66s »
pub(crate) fn parse_suggested_wait(message: &str) -> Option<f64> {
    let re = Regex::new(r"try again in ([0-9]+(?:\.[0-9]+)?)s").ok()?;
    re.captures(message)?.get(1)?.as_str().parse().ok()
}

/// Exécute `call` avec relance sur limite de débit.
///
/// Attente: délai suggéré par le serveur + 1 seconde, sinon 12 secondes.
/// Les erreurs non liées au débit ne sont jamais relancées.
pub async fn call_with_rate_limit_retry<T, F, Fut>(
    max_attempts: usize,
    mut call: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limit() && attempt < max_attempts => {
                let wait_secs = match &err {
                    GatewayError::RateLimited {
                        suggested_wait: Some(secs),
                        ..
                    } => secs + 1.0,
                    _ => 12.0,
                };
                warn!(
                    "⏳ Limite de débit atteinte (tentative {}/{}), attente de {:.1}s",
                    attempt, max_attempts, wait_secs
                );
                tokio::time::sleep(Duration::from_secs_f64(wait_secs)).await;
            }
            Err(err) => return Err(err),
        }
    }
}
