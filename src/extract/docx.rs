use regex::Regex;
use roxmltree::{Document, Node};
use std::io::{Cursor, Read};
use std::sync::LazyLock;
use zip::ZipArchive;

use super::{DocumentKind, ExtractError};

const WORD_NAMESPACE: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const COMPATIBILITY_NAMESPACE: &str =
    "http://schemas.openxmlformats.org/markup-compatibility/2006";
const DOCUMENT_PART: &str = "word/document.xml";

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace pattern is valid"));

/// Paragraph text in document order, blank paragraphs dropped, joined by newlines.
pub(super) fn extract(blob: &[u8]) -> Result<String, ExtractError> {
    let xml = read_document_part(blob)?;
    let document = Document::parse(&xml).map_err(fail)?;

    let paragraphs: Vec<String> = document
        .descendants()
        .filter(|node| is_word_element(node, "p"))
        .filter(|node| !node.ancestors().any(|ancestor| is_fallback(&ancestor)))
        .map(paragraph_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    Ok(collapse_whitespace(&paragraphs.join("\n")))
}

fn read_document_part(blob: &[u8]) -> Result<String, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(blob)).map_err(fail)?;
    let mut part = archive.by_name(DOCUMENT_PART).map_err(fail)?;
    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(fail)?;
    Ok(xml)
}

fn paragraph_text(paragraph: Node<'_, '_>) -> String {
    let mut text = String::new();
    collect_runs(paragraph, &mut text);
    text
}

fn collect_runs(node: Node<'_, '_>, out: &mut String) {
    for child in node.children().filter(Node::is_element) {
        if is_fallback(&child) {
            continue;
        }
        if child.tag_name().namespace() != Some(WORD_NAMESPACE) {
            collect_runs(child, out);
            continue;
        }
        match child.tag_name().name() {
            // Nested paragraphs (text boxes) are visited on their own.
            "p" | "pPr" | "rPr" => {}
            "t" => out.push_str(child.text().unwrap_or_default()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            _ => collect_runs(child, out),
        }
    }
}

fn is_word_element(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(WORD_NAMESPACE)
}

/// `mc:Fallback` repeats the content of the preceding `mc:Choice` for older readers.
fn is_fallback(node: &Node<'_, '_>) -> bool {
    node.is_element()
        && node.tag_name().name() == "Fallback"
        && node.tag_name().namespace() == Some(COMPATIBILITY_NAMESPACE)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").into_owned()
}

fn fail(error: impl std::fmt::Display) -> ExtractError {
    ExtractError::failed(DocumentKind::Docx, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures::docx_with_body;

    #[test]
    fn joins_non_empty_paragraphs_with_newlines() {
        let blob = docx_with_body(
            "<w:p><w:r><w:t>First</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t xml:space=\"preserve\">   </w:t></w:r></w:p>\
             <w:p><w:r><w:t>Second</w:t></w:r><w:r><w:t xml:space=\"preserve\"> line</w:t></w:r></w:p>",
        );
        assert_eq!(extract(&blob).expect("docx"), "First\nSecond line");
    }

    #[test]
    fn output_never_contains_whitespace_runs() {
        let blob = docx_with_body(
            "<w:p><w:r><w:t xml:space=\"preserve\">  lots   of\t\tspace  </w:t></w:r></w:p>\
             <w:p><w:r><w:t>tab</w:t><w:tab/><w:tab/><w:t>stops</w:t></w:r></w:p>",
        );
        let text = extract(&blob).expect("docx");
        assert_eq!(text, "lots of space\ntab stops");
        let chars: Vec<char> = text.chars().collect();
        assert!(
            chars
                .windows(2)
                .all(|pair| !(pair[0].is_whitespace() && pair[1].is_whitespace()))
        );
    }

    #[test]
    fn ignores_tab_stop_definitions_in_paragraph_properties() {
        let blob = docx_with_body(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>\
             <w:r><w:t>Heading</w:t></w:r></w:p>",
        );
        assert_eq!(extract(&blob).expect("docx"), "Heading");
    }

    #[test]
    fn reads_table_paragraphs_in_document_order() {
        let blob = docx_with_body(
            "<w:p><w:r><w:t>Before</w:t></w:r></w:p>\
             <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
             <w:p><w:r><w:t>After</w:t></w:r></w:p>",
        );
        assert_eq!(extract(&blob).expect("docx"), "Before\nCell\nAfter");
    }

    #[test]
    fn text_box_alternate_content_is_read_once() {
        let text_box = |marker: &str| {
            format!(
                "<w:pict><w:txbxContent><w:p><w:r><w:t>Boxed {marker}</w:t></w:r></w:p>\
                 </w:txbxContent></w:pict>"
            )
        };
        let blob = docx_with_body(&format!(
            "<w:p><w:r><w:t>Body</w:t></w:r><w:r>\
             <mc:AlternateContent xmlns:mc=\"{COMPATIBILITY_NAMESPACE}\">\
             <mc:Choice Requires=\"wps\">{}</mc:Choice>\
             <mc:Fallback>{}</mc:Fallback>\
             </mc:AlternateContent></w:r></w:p>",
            text_box("choice"),
            text_box("fallback"),
        ));

        let text = extract(&blob).expect("docx");

        assert_eq!(text, "Body\nBoxed choice");
        assert_eq!(text.matches("Boxed").count(), 1);
    }

    #[test]
    fn non_zip_input_fails() {
        let error = extract(b"plain bytes").expect_err("not a docx");
        assert!(matches!(
            error,
            ExtractError::ExtractionFailed {
                kind: DocumentKind::Docx,
                ..
            }
        ));
    }
}
