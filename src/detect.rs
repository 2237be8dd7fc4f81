//! PDF input validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Check that `path` names a readable, non-empty PDF file.
///
/// # Returns
/// * `Ok(())` when the file exists, has a `.pdf` extension (any case), is not
///   empty and starts with `%PDF-`
/// * `Err(Error::FileNotFound)`, `Err(Error::NotPdf)` or `Err(Error::EmptyFile)`
///   otherwise
///
/// # Example
/// ```no_run
/// use pdf_extractor::detect::validate_pdf;
///
/// validate_pdf("input/pdfs/manual.pdf").unwrap();
/// ```
pub fn validate_pdf<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    if !has_pdf_extension(path) {
        return Err(Error::NotPdf(path.to_path_buf()));
    }

    let mut file = File::open(path)?;
    let mut header = Vec::with_capacity(PDF_MAGIC.len());
    file.by_ref()
        .take(PDF_MAGIC.len() as u64)
        .read_to_end(&mut header)?;

    if header.is_empty() {
        return Err(Error::EmptyFile(path.to_path_buf()));
    }
    if !is_pdf_bytes(&header) {
        return Err(Error::NotPdf(path.to_path_buf()));
    }
    Ok(())
}

/// Whether the path ends in `.pdf`, ignoring case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Whether the data starts with the PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}

/// Check if a file is a valid PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    validate_pdf(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_valid_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.PDF");
        fs::write(&path, b"%PDF-1.7\n%...").unwrap();
        assert!(validate_pdf(&path).is_ok());
        assert!(is_pdf(&path));
    }

    #[test]
    fn test_missing_file() {
        let err = validate_pdf("/nonexistent/doc.pdf").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_wrong_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, b"%PDF-1.7").unwrap();
        assert!(matches!(validate_pdf(&path), Err(Error::NotPdf(_))));
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.pdf");
        fs::write(&path, b"").unwrap();
        assert!(matches!(validate_pdf(&path), Err(Error::EmptyFile(_))));
    }

    #[test]
    fn test_bad_magic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.pdf");
        fs::write(&path, b"<html></html>").unwrap();
        assert!(matches!(validate_pdf(&path), Err(Error::NotPdf(_))));
        assert!(!is_pdf_bytes(b"%PD"));
    }
}
