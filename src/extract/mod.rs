//! Text extraction for uploaded documents.
//!
//! Dispatch happens on the file extension alone: an upload named `notes.txt` is always decoded
//! as text. Every extractor is a pure, synchronous function of the input bytes.

mod docx;
mod pdf;
mod xml;

use bytes::Bytes;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Extensions accepted by the upload endpoints, without the leading dot.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "xml", "txt"];

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
    /// Generic XML document.
    Xml,
    /// Plain text, decoded as UTF-8.
    Txt,
}

impl DocumentKind {
    /// Resolve the document kind from a filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Option<Self> {
        match extension_of(filename)?.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "xml" => Some(Self::Xml),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Lower-case extension associated with the kind.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Xml => "xml",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Xml => "XML",
            Self::Txt => "TXT",
        })
    }
}

/// Errors raised while turning document bytes into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The filename's extension is not one of [`ALLOWED_EXTENSIONS`].
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
    /// The format parser rejected the document.
    #[error("Failed to extract text from {kind} document: {message}")]
    ExtractionFailed {
        /// Format that was being parsed.
        kind: DocumentKind,
        /// Parser diagnostic.
        message: String,
    },
}

impl ExtractError {
    pub(crate) fn failed(kind: DocumentKind, error: impl fmt::Display) -> Self {
        Self::ExtractionFailed {
            kind,
            message: error.to_string(),
        }
    }
}

/// A buffered upload whose extension has already been validated.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Client-supplied filename.
    pub filename: String,
    /// Format resolved from the filename.
    pub kind: DocumentKind,
    /// Complete file contents.
    pub bytes: Bytes,
}

impl UploadedDocument {
    /// Validate the filename and wrap the bytes.
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self, ExtractError> {
        let filename = filename.into();
        let kind = DocumentKind::from_filename(&filename).ok_or_else(|| {
            ExtractError::UnsupportedFormat(display_extension(&filename))
        })?;
        Ok(Self {
            filename,
            kind,
            bytes: bytes.into(),
        })
    }

    /// Extract the document's text.
    pub fn extract(&self) -> Result<String, ExtractError> {
        extract_kind(self.kind, &self.bytes)
    }
}

/// Extract text from `blob`, choosing the parser from `filename`'s extension.
pub fn extract_text(filename: &str, blob: &[u8]) -> Result<String, ExtractError> {
    let kind = DocumentKind::from_filename(filename)
        .ok_or_else(|| ExtractError::UnsupportedFormat(display_extension(filename)))?;
    extract_kind(kind, blob)
}

/// Extract text from `blob` using the parser for `kind`.
pub fn extract_kind(kind: DocumentKind, blob: &[u8]) -> Result<String, ExtractError> {
    match kind {
        DocumentKind::Pdf => pdf::extract(blob),
        DocumentKind::Docx => docx::extract(blob),
        DocumentKind::Xml => xml::extract(blob),
        // Invalid sequences become U+FFFD instead of failing the upload.
        DocumentKind::Txt => Ok(String::from_utf8_lossy(blob).into_owned()),
    }
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

fn display_extension(filename: &str) -> String {
    extension_of(filename)
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| "(none)".to_string())
}
