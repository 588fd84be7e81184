//! OCR local Tesseract - couche capacité
//!
//! Reconnaissance du texte imprimé : prétraitement d'image (niveaux de
//! gris + binarisation d'Otsu) puis appel du binaire `tesseract`. Sert
//! aussi à mesurer la confiance moyenne pour décider de la nature du
//! document (imprimé ou manuscrit).

use std::path::Path;

use image::GrayImage;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::OcrError;

const OCR_LANGUAGE: &str = "fra";

/// Moteur OCR local
pub struct LocalOcr {
    tesseract_path: String,
}

impl LocalOcr {
    pub fn new(config: &Config) -> Self {
        Self {
            tesseract_path: config.tesseract_path.clone(),
        }
    }

    /// Reconnaît le texte d'une image de page
    pub async fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let preprocessed = self.preprocess(image_path)?;
        let output = self
            .run_tesseract(preprocessed.path(), &["stdout", "-l", OCR_LANGUAGE])
            .await?;
        Ok(output.trim().to_string())
    }

    /// Confiance moyenne de reconnaissance (0-100) sur une image de page.
    /// Les mots sans score (-1 dans la sortie TSV) sont ignorés.
    pub async fn mean_confidence(&self, image_path: &Path) -> Result<f64, OcrError> {
        let preprocessed = self.preprocess(image_path)?;
        let tsv = self
            .run_tesseract(preprocessed.path(), &["stdout", "-l", OCR_LANGUAGE, "tsv"])
            .await?;

        let mut sum = 0.0;
        let mut count = 0u32;
        for line in tsv.lines().skip(1) {
            let fields: Vec<&str> = line.split('\t').collect();
            // colonne 11: conf, colonne 12: texte
            if fields.len() < 12 {
                continue;
            }
            if let Ok(conf) = fields[10].parse::<f64>() {
                if conf >= 0.0 && !fields[11].trim().is_empty() {
                    sum += conf;
                    count += 1;
                }
            }
        }

        let mean = if count > 0 { sum / count as f64 } else { 0.0 };
        debug!("🔍 Confiance moyenne: {:.1} ({} mots)", mean, count);
        Ok(mean)
    }

    /// Niveaux de gris puis binarisation d'Otsu, vers un PNG temporaire
    fn preprocess(&self, image_path: &Path) -> Result<NamedTempFile, OcrError> {
        let gray = image::open(image_path)?.into_luma8();
        let threshold = otsu_threshold(&gray);

        let mut binary = gray;
        for pixel in binary.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
        }

        let file = tempfile::Builder::new().suffix(".png").tempfile()?;
        binary
            .save_with_format(file.path(), image::ImageFormat::Png)
            .map_err(OcrError::ImageDecode)?;
        Ok(file)
    }

    async fn run_tesseract(&self, image_path: &Path, args: &[&str]) -> Result<String, OcrError> {
        let output = Command::new(&self.tesseract_path)
            .arg(image_path)
            .args(args)
            .output()
            .await
            .map_err(|e| OcrError::Engine(format!("{}: {e}", self.tesseract_path)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract a échoué: {}",
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Seuil d'Otsu : maximise la variance inter-classes de l'histogramme
fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 127;
    }

    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, count)| level as f64 * *count as f64)
        .sum();

    let mut best_threshold = 0u8;
    let mut best_variance = 0.0f64;
    let mut background_count = 0u64;
    let mut background_sum = 0.0f64;

    for level in 0..256usize {
        background_count += histogram[level];
        if background_count == 0 {
            continue;
        }
        let foreground_count = total - background_count;
        if foreground_count == 0 {
            break;
        }

        background_sum += level as f64 * histogram[level] as f64;
        let mean_background = background_sum / background_count as f64;
        let mean_foreground = (weighted_sum - background_sum) / foreground_count as f64;

        let variance = background_count as f64
            * foreground_count as f64
            * (mean_background - mean_foreground).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = level as u8;
        }
    }

    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_otsu_separates_bimodal_image() {
        // moitié sombre (encre), moitié claire (papier)
        let mut img = GrayImage::new(10, 10);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            *pixel = Luma([if x < 5 { 30 } else { 220 }]);
        }
        let threshold = otsu_threshold(&img);
        assert!(threshold >= 30 && threshold < 220, "seuil: {threshold}");
    }

    #[test]
    fn test_otsu_uniform_image_does_not_panic() {
        let img = GrayImage::from_pixel(4, 4, Luma([128]));
        let _ = otsu_threshold(&img);
    }

    #[test]
    fn test_tsv_confidence_parsing() {
        // extrait de sortie TSV: la moyenne ignore les conf à -1
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t90\tBonjour\n\
                   5\t1\t1\t1\t1\t2\t70\t10\t50\t20\t-1\t\n\
                   5\t1\t1\t1\t1\t3\t130\t10\t50\t20\t70\tmonde\n";

        let mut sum = 0.0;
        let mut count = 0u32;
        for line in tsv.lines().skip(1) {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 12 {
                continue;
            }
            if let Ok(conf) = fields[10].parse::<f64>() {
                if conf >= 0.0 && !fields[11].trim().is_empty() {
                    sum += conf;
                    count += 1;
                }
            }
        }
        assert_eq!(count, 2);
        assert_eq!(sum / count as f64, 80.0);
    }
}
