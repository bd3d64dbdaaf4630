use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use regex::bytes::Regex;
use roxmltree::{Document, ParsingOptions};
use std::borrow::Cow;
use std::sync::LazyLock;

use super::{DocumentKind, ExtractError};

/// Bytes searched for the `<?xml ... ?>` declaration.
const DECLARATION_WINDOW: usize = 256;

static ENCODING_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#)
        .expect("encoding declaration pattern is valid")
});

/// All non-blank text nodes in depth-first order, trimmed and joined by newlines.
pub(super) fn extract(blob: &[u8]) -> Result<String, ExtractError> {
    let source = decode(blob)?;
    let source = source.strip_prefix('\u{feff}').unwrap_or(&source);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(source, options).map_err(fail)?;

    let parts: Vec<&str> = document
        .descendants()
        .filter(|node| node.is_text())
        .filter_map(|node| node.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect();

    Ok(parts.join("\n"))
}

/// Decode `blob` using, in order: a byte order mark, the UTF-16 signature of `<?`, the
/// encoding named in the XML declaration, and UTF-8.
fn decode(blob: &[u8]) -> Result<Cow<'_, str>, ExtractError> {
    let (encoding, body) = match Encoding::for_bom(blob) {
        Some((encoding, bom_length)) => (encoding, &blob[bom_length..]),
        None => (sniff_encoding(blob)?, blob),
    };
    tracing::debug!(encoding = encoding.name(), "Decoding XML document");
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| fail(format!("document is not valid {}", encoding.name())))
}

fn sniff_encoding(blob: &[u8]) -> Result<&'static Encoding, ExtractError> {
    match blob {
        [0x3C, 0x00, 0x3F, 0x00, ..] => return Ok(UTF_16LE),
        [0x00, 0x3C, 0x00, 0x3F, ..] => return Ok(UTF_16BE),
        _ => {}
    }
    let window = &blob[..blob.len().min(DECLARATION_WINDOW)];
    let Some(label) = ENCODING_DECLARATION
        .captures(window)
        .and_then(|captures| captures.get(1))
    else {
        return Ok(UTF_8);
    };
    let label = label.as_bytes();
    // The declaration was read as ASCII, so a UTF-16 label here is wrong and UTF-8 applies.
    Encoding::for_label(label)
        .map(Encoding::output_encoding)
        .ok_or_else(|| {
            fail(format!(
                "unsupported encoding '{}'",
                String::from_utf8_lossy(label)
            ))
        })
}

fn fail(error: impl std::fmt::Display) -> ExtractError {
    ExtractError::failed(DocumentKind::Xml, error)
}
