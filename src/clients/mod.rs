//! Clients externes : passerelle IA et service OCR en ligne

pub mod ai_gateway;
pub mod ocr_space;

pub use ai_gateway::{call_with_rate_limit_retry, AiGateway, Provider};
pub use ocr_space::OcrSpaceClient;
