//! Plain-text extraction for uploaded documents.
//!
//! Callers supply bytes plus a content type; this module returns trimmed
//! UTF-8 text, or an [`ExtractError`] for malformed or unsupported input.

use std::io::Read;
use std::panic::AssertUnwindSafe;

use parley_core::error::ExtractError;

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Content types accepted for upload.
pub const SUPPORTED_CONTENT_TYPES: &[&str] = &[MIME_TEXT, MIME_MARKDOWN, MIME_PDF, MIME_DOCX];

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Strip parameters and normalize case: `Text/Plain; charset=utf-8` → `text/plain`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_supported(content_type: &str) -> bool {
    SUPPORTED_CONTENT_TYPES.contains(&normalize_content_type(content_type).as_str())
}

/// Guess a content type from a file extension.
pub fn content_type_for_path(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "text" => Some(MIME_TEXT),
        "md" | "markdown" => Some(MIME_MARKDOWN),
        "pdf" => Some(MIME_PDF),
        "docx" => Some(MIME_DOCX),
        _ => None,
    }
}

/// Extract trimmed text from `bytes` according to `content_type`.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::Empty);
    }

    let text = match normalize_content_type(content_type).as_str() {
        MIME_TEXT | MIME_MARKDOWN => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| ExtractError::Encoding(e.to_string()))?,
        MIME_PDF => extract_pdf(bytes)?,
        MIME_DOCX => extract_docx(bytes)?,
        _ => {
            return Err(ExtractError::UnsupportedContentType(
                content_type.to_string(),
            ));
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(trimmed.to_string())
}

/// `pdf-extract` panics on some malformed documents (e.g. a page that uses a
/// font without `/Resources`). The panic is contained and reported as an error.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(result) => result.map_err(|e| ExtractError::Pdf(e.to_string())),
        Err(payload) => Err(ExtractError::Pdf(format!(
            "malformed PDF: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("parser panicked")
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Docx("word/document.xml not found".into()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".into(),
        ));
    }

    paragraphs_from_document_xml(&xml)
}

/// Collect `<w:t>` runs, one line per `<w:p>` paragraph.
fn paragraphs_from_document_xml(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"tab" => out.push('\t'),
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn plain_text_is_trimmed() {
        let text = extract_text(b"  hello world \n", "text/plain").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(normalize_content_type("Text/Plain; charset=utf-8"), "text/plain");
        assert!(is_supported("text/markdown"));
        assert!(!is_supported("image/png"));
        assert!(extract_text(b"# Title", "text/markdown; charset=UTF-8").is_ok());
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let err = extract_text(b"\x89PNG", "image/png").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(extract_text(b"", "text/plain"), Err(ExtractError::Empty)));
        assert!(matches!(extract_text(b"  \n\t", "text/plain"), Err(ExtractError::Empty)));
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let err = extract_text(&[0xff, 0xfe, 0x41], "text/plain").unwrap_err();
        assert!(matches!(err, ExtractError::Encoding(_)));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Refund policy</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Returns within </w:t></w:r><w:r><w:t>30 days &amp; more</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let text = extract_text(&docx_with(xml), MIME_DOCX).unwrap();
        assert_eq!(text, "Refund policy\nReturns within 30 days & more");
    }

    #[test]
    fn docx_without_document_xml_is_an_error() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        let err = extract_text(&cursor.into_inner(), MIME_DOCX).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    /// A one-page PDF with a valid xref table whose content stream uses
    /// font `/F1` but whose page has no `/Resources`.
    fn pdf_without_font_resources() -> Vec<u8> {
        let content = "BT /F1 12 Tf 72 712 Td (Hello refund policy) Tj ET";
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>".to_string(),
            format!(
                "<< /Length {} >>\nstream\n{content}\nendstream",
                content.len()
            ),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }

        let xref_at = pdf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.extend_from_slice(xref.as_bytes());
        pdf
    }

    #[test]
    fn pdf_missing_font_resources_is_an_error_not_a_panic() {
        let result = extract_text(&pdf_without_font_resources(), MIME_PDF);
        assert!(matches!(result, Err(ExtractError::Pdf(_))), "got {result:?}");
    }

    #[test]
    fn garbage_pdf_is_an_error() {
        let result = extract_text(b"not a pdf at all", MIME_PDF);
        assert!(matches!(result, Err(ExtractError::Pdf(_))), "got {result:?}");
    }

    #[test]
    fn extension_lookup() {
        use std::path::Path;
        assert_eq!(content_type_for_path(Path::new("a/notes.MD")), Some(MIME_MARKDOWN));
        assert_eq!(content_type_for_path(Path::new("report.pdf")), Some(MIME_PDF));
        assert_eq!(content_type_for_path(Path::new("image.png")), None);
    }
}
