//! Source documents and the client-side guard that runs before submission.
//!
//! The controller assumes every document it receives already passed
//! [`SourceDocument::validate`]; rejections here are reported to the user
//! directly and never become a job.

use std::path::Path;

use crate::config::UploadConfig;
use crate::error::{DocumentError, ValidationError};

/// A document selected by the user, held in memory for upload and preview.
#[derive(Clone)]
pub struct SourceDocument {
    filename: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl SourceDocument {
    /// Creates a document from in-memory bytes. The MIME type is guessed from the filename.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    /// Reads a document from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| DocumentError::MissingFileName(path.to_path_buf()))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| DocumentError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self::new(filename, bytes))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Checks file kind and size against the upload policy.
    pub fn validate(&self, policy: &UploadConfig) -> Result<(), ValidationError> {
        let extension = Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        let allowed = extension.as_deref().is_some_and(|ext| {
            policy
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        });
        if !allowed {
            return Err(ValidationError::UnsupportedType {
                filename: self.filename.clone(),
            });
        }

        if self.bytes.is_empty() {
            return Err(ValidationError::Empty {
                filename: self.filename.clone(),
            });
        }

        if self.size() > policy.max_file_size_bytes {
            return Err(ValidationError::TooLarge {
                size: self.size(),
                limit_mb: policy.max_file_size_bytes / (1024 * 1024),
            });
        }

        Ok(())
    }
}

// Document bytes stay out of logs and debug output.
impl std::fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDocument")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{FailureKind, JobFailure};

    fn pdf(name: &str, size: usize) -> SourceDocument {
        SourceDocument::new(name, vec![b'%'; size])
    }

    #[test]
    fn test_mime_type_guessed_from_name() {
        assert_eq!(pdf("report.pdf", 4).mime_type(), "application/pdf");
        assert_eq!(
            pdf("blob", 4).mime_type(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_accepts_pdf_under_limit() {
        let policy = UploadConfig::default();
        assert!(pdf("deck.PDF", 1024).validate(&policy).is_ok());
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let policy = UploadConfig::default();
        let err = pdf("notes.docx", 10).validate(&policy).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));

        let err = pdf("no_extension", 10).validate(&policy).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn test_rejects_empty_file() {
        let policy = UploadConfig::default();
        let err = pdf("empty.pdf", 0).validate(&policy).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Empty {
                filename: "empty.pdf".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_oversized_file() {
        let policy = UploadConfig {
            max_file_size_bytes: 2 * 1024 * 1024,
            ..UploadConfig::default()
        };
        let err = pdf("big.pdf", 2 * 1024 * 1024 + 1)
            .validate(&policy)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLarge {
                size: 2 * 1024 * 1024 + 1,
                limit_mb: 2
            }
        );
        assert_eq!(err.to_string(), "File size exceeds 2MB limit (2097153 bytes)");
    }

    #[test]
    fn test_validation_error_maps_to_validation_failure() {
        let err = ValidationError::UnsupportedType {
            filename: "a.txt".to_string(),
        };
        let failure = JobFailure::from(&err);
        assert_eq!(failure.kind, FailureKind::Validation);
    }

    #[test]
    fn test_debug_omits_bytes() {
        let rendered = format!("{:?}", pdf("x.pdf", 3));
        assert!(rendered.contains("size: 3"));
        assert!(!rendered.contains("37"));
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let doc = SourceDocument::from_path(&path).await.unwrap();
        assert_eq!(doc.filename(), "scan.pdf");
        assert_eq!(doc.bytes(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = SourceDocument::from_path("/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Read { .. }));
    }
}
