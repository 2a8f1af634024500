//! Input loading: read a template, reference or instructions file as text.
//!
//! ## Why reject PDFs here?
//!
//! Templates are usually distributed as PDFs, but the generator works on
//! their text content. Reading a PDF as UTF-8 either fails with an opaque
//! decoding error or, worse, feeds binary noise to the model. Checking the
//! `%PDF` magic bytes first lets us tell the user exactly what to do.

use crate::error::ReportError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read a UTF-8 text file, returning its content.
///
/// Fails with [`ReportError::EmptyInput`] if the file holds only whitespace,
/// and with [`ReportError::PdfNotSupported`] if it starts with `%PDF`.
pub fn load_text(path: impl AsRef<Path>) -> Result<String, ReportError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ReportError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ReportError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ReportError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|source| ReportError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    if bytes.starts_with(b"%PDF") {
        return Err(ReportError::PdfNotSupported {
            path: path.to_path_buf(),
        });
    }

    let text = String::from_utf8(bytes).map_err(|e| ReportError::ReadFailed {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    if text.trim().is_empty() {
        return Err(ReportError::EmptyInput {
            path: path.to_path_buf(),
        });
    }

    debug!("Loaded {} chars from {}", text.chars().count(), path.display());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f
    }

    #[test]
    fn loads_utf8_text() {
        let f = write_temp("1. 사업 개요\n2. 추진 계획\n".as_bytes());
        let text = load_text(f.path()).unwrap();
        assert!(text.starts_with("1. 사업 개요"));
    }

    #[test]
    fn missing_file() {
        let err = load_text("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound { .. }));
    }

    #[test]
    fn rejects_pdf() {
        let f = write_temp(b"%PDF-1.7\n%binary");
        let err = load_text(f.path()).unwrap_err();
        assert!(matches!(err, ReportError::PdfNotSupported { .. }));
    }

    #[test]
    fn rejects_blank_file() {
        let f = write_temp(b"  \n\t\n");
        let err = load_text(f.path()).unwrap_err();
        assert!(matches!(err, ReportError::EmptyInput { .. }));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let f = write_temp(&[0xff, 0xfe, 0x00, 0x41]);
        let err = load_text(f.path()).unwrap_err();
        assert!(matches!(err, ReportError::ReadFailed { .. }));
    }
}
