//! OCR collaborator
//!
//! The scan pipeline only needs `recognize(image) -> text`. The shipped
//! engine shells out to the `tesseract` CLI; tests plug in their own.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum OcrError {
    /// Engine binary missing or not runnable
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    /// Engine ran but rejected the input
    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns an image into unstructured text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &str;

    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Tesseract CLI engine
pub struct TesseractEngine {
    binary: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: &str, language: &str) -> Self {
        Self {
            binary: binary.to_string(),
            language: language.to_string(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let input_path =
            std::env::temp_dir().join(format!("power_play_scan_{}.img", uuid::Uuid::new_v4()));

        tokio::fs::write(&input_path, image).await?;

        // "stdout" as output base makes tesseract print the text instead of writing a file
        let output = Command::new(&self.binary)
            .arg(&input_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .await;

        let _ = tokio::fs::remove_file(&input_path).await;

        let output = output.map_err(|e| {
            OcrError::Unavailable(format!("failed to run {}: {}", self.binary, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let engine = TesseractEngine::new("power-play-no-such-ocr-binary", "eng");
        let err = engine.recognize(b"not an image").await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }

    #[test]
    fn test_default_language() {
        let engine = TesseractEngine::default();
        assert_eq!(engine.language(), "eng");
        assert_eq!(engine.name(), "tesseract");
    }
}
