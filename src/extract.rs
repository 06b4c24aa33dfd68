//! Text extraction for binary document formats (PDF, DOCX).
//!
//! The loader hands over raw bytes; this module returns plain UTF-8 text.
//! Extraction failures are returned as errors so the pipeline can skip the
//! file rather than abort the whole run.

use std::io::Read;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Docx(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the full text of a PDF document.
///
/// pdf-extract returns the whole document in one string; page boundaries are
/// not recoverable, so PDF-derived documents carry no page metadata.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Extract the paragraph text of a DOCX document.
///
/// Reads `word/document.xml` from the ZIP container and collects the
/// `<w:t>` text runs, inserting a newline at each paragraph end.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Docx(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    collect_text_runs(&doc_xml)
}

fn collect_text_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_text => {
                out.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    // Paragraph end: keep the line structure of the document.
                    b"p" => {
                        if !out.ends_with('\n') && !out.is_empty() {
                            out.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}
