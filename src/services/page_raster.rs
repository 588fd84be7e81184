//! Rastérisation des documents - couche capacité
//!
//! Convertit un document déposé en images de pages exploitables par le
//! moteur OCR local. Les PDF passent par `pdftoppm`, les images sont
//! utilisées telles quelles.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::config::Config;
use crate::error::OcrError;

/// Pages rastérisées d'un document.
///
/// Le répertoire temporaire vit aussi longtemps que cette valeur ; les
/// chemins deviennent invalides après sa destruction.
pub struct RasterizedPages {
    _workdir: Option<TempDir>,
    pages: Vec<PathBuf>,
}

impl RasterizedPages {
    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Rastériseur de documents
pub struct PageRaster {
    pdftoppm_path: String,
    render_dpi: u32,
}

impl PageRaster {
    pub fn new(config: &Config) -> Self {
        Self {
            pdftoppm_path: config.pdftoppm_path.clone(),
            render_dpi: config.render_dpi,
        }
    }

    /// Produit une image par page du document.
    ///
    /// PDF: rendu via `pdftoppm` à la résolution configurée.
    /// PNG/JPG: une seule page, le fichier d'origine.
    pub async fn rasterize(&self, path: &Path) -> Result<RasterizedPages, OcrError> {
        if !path.exists() {
            return Err(OcrError::FileNotFound(path.display().to_string()));
        }

        let extension = path
            .extension()
            .map(|e| e.to_ascii_lowercase().to_string_lossy().into_owned())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => self.rasterize_pdf(path).await,
            "png" | "jpg" | "jpeg" => Ok(RasterizedPages {
                _workdir: None,
                pages: vec![path.to_path_buf()],
            }),
            other => Err(OcrError::UnsupportedFormat(other.to_string())),
        }
    }

    async fn rasterize_pdf(&self, path: &Path) -> Result<RasterizedPages, OcrError> {
        let workdir = TempDir::new()?;
        let prefix = workdir.path().join("page");

        debug!(
            "🖨️ Rendu de '{}' à {} dpi via {}",
            path.display(),
            self.render_dpi,
            self.pdftoppm_path
        );

        let output = Command::new(&self.pdftoppm_path)
            .arg("-r")
            .arg(self.render_dpi.to_string())
            .arg("-png")
            .arg(path)
            .arg(&prefix)
            .output()
            .await
            .map_err(|e| OcrError::RenderFailed(format!("{}: {e}", self.pdftoppm_path)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::RenderFailed(format!(
                "pdftoppm a échoué: {}",
                stderr.trim()
            )));
        }

        // pdftoppm numérote page-1.png, page-2.png, ... ; le tri lexical ne
        // suffit pas au-delà de 9 pages, on trie sur le numéro.
        let mut pages: Vec<PathBuf> = std::fs::read_dir(workdir.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().map(|e| e == "png").unwrap_or(false))
            .collect();
        pages.sort_by_key(|p| page_number(p));

        if pages.is_empty() {
            return Err(OcrError::RenderFailed(
                "pdftoppm n'a produit aucune page".to_string(),
            ));
        }

        debug!("🖨️ {} page(s) rendue(s)", pages.len());

        Ok(RasterizedPages {
            _workdir: Some(workdir),
            pages,
        })
    }
}

fn page_number(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit('-').next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_sorts_beyond_nine() {
        let mut pages = vec![
            PathBuf::from("/tmp/x/page-10.png"),
            PathBuf::from("/tmp/x/page-2.png"),
            PathBuf::from("/tmp/x/page-1.png"),
        ];
        pages.sort_by_key(|p| page_number(p));
        assert_eq!(pages[0].file_name().unwrap(), "page-1.png");
        assert_eq!(pages[1].file_name().unwrap(), "page-2.png");
        assert_eq!(pages[2].file_name().unwrap(), "page-10.png");
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let raster = PageRaster::new(&Config::default());
        let result = raster.rasterize(Path::new("/nonexistent/copie.pdf")).await;
        assert!(matches!(result, Err(OcrError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_unsupported_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copie.docx");
        std::fs::write(&path, b"stub").unwrap();

        let raster = PageRaster::new(&Config::default());
        let result = raster.rasterize(&path).await;
        assert!(matches!(result, Err(OcrError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_image_is_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copie.png");
        std::fs::write(&path, b"stub").unwrap();

        let raster = PageRaster::new(&Config::default());
        let pages = raster.rasterize(&path).await.unwrap();
        assert_eq!(pages.page_count(), 1);
        assert_eq!(pages.pages()[0], path);
    }
}
