use std::any::Any;
use std::panic;

use super::{DocumentKind, ExtractError};

/// Concatenate per-page text in page order.
///
/// `pdf-extract` panics on some malformed inputs, so the call is isolated and a panic is
/// reported as an extraction failure.
pub(super) fn extract(blob: &[u8]) -> Result<String, ExtractError> {
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(blob))
        .map_err(|payload| ExtractError::failed(DocumentKind::Pdf, panic_message(payload.as_ref())))?
        .map_err(|error| ExtractError::failed(DocumentKind::Pdf, error))?;
    tracing::debug!(pages = pages.len(), "Extracted PDF pages");
    Ok(pages.concat())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("parser panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("parser panicked: {message}")
    } else {
        "parser panicked".to_string()
    }
}
