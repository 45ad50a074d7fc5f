//! Pre-recognized text files on disk
//!
//! For development without an OCR service. The image `bucket/key` maps to
//! `<root>/<bucket>/<key>.txt`. Each non-blank line is either
//! `<confidence>\t<text>` or bare text (confidence 100).

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ImageLocator, RawTextLine};

use super::{clamp_confidence, OcrEngine};

#[derive(Clone, Debug)]
pub struct LocalTextOcr {
    root: PathBuf,
}

impl LocalTextOcr {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn text_path(&self, locator: &ImageLocator) -> Result<PathBuf> {
        for part in [&locator.bucket, &locator.key] {
            let escapes = Path::new(part)
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if part.is_empty() || escapes {
                return Err(Error::Validation(format!(
                    "Invalid image locator: {}",
                    locator
                )));
            }
        }
        Ok(self
            .root
            .join(&locator.bucket)
            .join(format!("{}.txt", locator.key)))
    }
}

fn parse_line(line: &str) -> Option<RawTextLine> {
    if line.trim().is_empty() {
        return None;
    }
    if let Some((conf, text)) = line.split_once('\t') {
        if let Ok(conf) = conf.trim().parse::<f64>() {
            return Some(RawTextLine::new(text.trim(), clamp_confidence(conf)));
        }
    }
    Some(RawTextLine::new(line.trim(), 100.0))
}

#[async_trait]
impl OcrEngine for LocalTextOcr {
    async fn recognize(&self, locator: &ImageLocator) -> Result<Vec<RawTextLine>> {
        let path = self.text_path(locator)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::DocumentNotFound(locator.to_string()))
            }
            Err(e) => return Err(Error::Io(e)),
        };
        tracing::debug!(path = %path.display(), "Read pre-recognized receipt text");
        Ok(content.lines().filter_map(parse_line).collect())
    }

    async fn health_check(&self) -> bool {
        self.root.is_dir()
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("72.5\tJOE'S DINER"),
            Some(RawTextLine::new("JOE'S DINER", 72.5))
        );
        assert_eq!(
            parse_line("Burger 12.00"),
            Some(RawTextLine::new("Burger 12.00", 100.0))
        );
        assert_eq!(parse_line("   "), None);
    }

    #[tokio::test]
    async fn test_recognize_reads_text_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("receipts")).unwrap();
        std::fs::write(
            dir.path().join("receipts").join("r1.jpg.txt"),
            "95\tJOE'S DINER\n\nBurger 12.00\n",
        )
        .unwrap();

        let ocr = LocalTextOcr::new(dir.path().to_path_buf());
        let lines = ocr
            .recognize(&ImageLocator::new("receipts", "r1.jpg"))
            .await
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].confidence, 95.0);
        assert!(ocr.health_check().await);
    }

    #[tokio::test]
    async fn test_missing_file_is_document_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = LocalTextOcr::new(dir.path().to_path_buf());
        let err = ocr
            .recognize(&ImageLocator::new("receipts", "nope.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = LocalTextOcr::new(dir.path().to_path_buf());
        let err = ocr
            .recognize(&ImageLocator::new("..", "etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
