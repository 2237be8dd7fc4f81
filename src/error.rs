//! Error types for pdf-extractor.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pdf-extractor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input path does not exist or is not a regular file.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The input exists but is not a PDF.
    #[error("Not a valid PDF: {}", .0.display())]
    NotPdf(PathBuf),

    /// The input file has no content.
    #[error("File is empty: {}", .0.display())]
    EmptyFile(PathBuf),

    /// Other invalid input (bad directory, no PDFs found, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and requires a password.
    #[error("Document is encrypted")]
    Encrypted,

    /// The parsing collaborator failed for another reason.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration file is not valid YAML for the expected schema.
    #[error("Configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A configured regular expression does not compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Unknown configuration preset.
    #[error("Unknown preset '{0}'. Available presets: {1}")]
    UnknownPreset(String, String),

    /// A table or other element could not be rendered.
    #[error("Rendering error: {0}")]
    Render(String),

    /// The cache store could not be read or written.
    #[error("Cache error: {0}")]
    Cache(String),

    /// JSON (de)serialization error, used by the cache store.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of an [`Error`], deciding how far it propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, empty or non-PDF input; aborts that file only.
    InvalidInput,
    /// The parsing collaborator failed; that file is marked failed.
    Extraction,
    /// Bad configuration; fatal before any file is processed.
    Configuration,
    /// A single element could not be rendered; the rest of the document survives.
    Render,
    /// Filesystem error while reading inputs or writing outputs.
    Io,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileNotFound(_)
            | Error::NotPdf(_)
            | Error::EmptyFile(_)
            | Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::PdfParse(_) | Error::Encrypted | Error::Extraction(_) => ErrorKind::Extraction,
            Error::Config(_) | Error::Yaml(_) | Error::Pattern { .. } | Error::UnknownPreset(..) => {
                ErrorKind::Configuration
            }
            Error::Render(_) => ErrorKind::Render,
            Error::Io(_) | Error::Cache(_) | Error::Json(_) => ErrorKind::Io,
        }
    }

    /// Whether this error must stop the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// A short, user-facing suggestion for fixing the problem.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::FileNotFound(_) => Some("Check the file path and make sure the file exists."),
            Error::NotPdf(_) => Some("Only PDF files (.pdf) can be processed."),
            Error::EmptyFile(_) => Some("The file is empty; re-download or re-export it."),
            Error::Encrypted => {
                Some("The PDF is password-protected. Remove the password and try again.")
            }
            Error::PdfParse(_) => {
                Some("The PDF may be corrupted. Try opening and re-saving it in a PDF viewer.")
            }
            Error::Yaml(_) => Some("Check config.yaml for YAML syntax errors (indentation, colons)."),
            Error::Pattern { .. } => Some("Fix the regular expression in the markdown section."),
            Error::UnknownPreset(..) => Some("Run with --list-presets to see the available presets."),
            Error::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Some("Check that you have permission to read the input and write the output folder.")
            }
            _ => None,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
