//! Multi-format text extraction for uploaded documents.
//!
//! Dispatches on the declared MIME type, falling back to the file name
//! extension when the MIME type is empty or unreliable. PDF and DOCX decode
//! failures are errors; a format we simply cannot read (images, unknown
//! binary) yields an empty string instead, because absence of text is not an
//! extraction failure.

use std::io::Read;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Maximum decompressed bytes read from a DOCX ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Decoder failure on malformed input. Recorded verbatim as the document's
/// processing error.
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

/// Extract plain text from raw document bytes.
///
/// Returns an empty string for formats that carry no extractable text; only
/// a malformed PDF or DOCX is an error.
pub fn extract_text(
    bytes: &[u8],
    mime_type: &str,
    file_name: &str,
) -> Result<String, ExtractError> {
    let name = file_name.to_ascii_lowercase();

    if mime_type == MIME_PDF || name.ends_with(".pdf") {
        return extract_pdf(bytes);
    }
    if mime_type == MIME_DOCX || name.ends_with(".docx") {
        return extract_docx(bytes);
    }
    if name.ends_with(".doc") {
        // Legacy Word has no text-layer decoder here; a lossy UTF-8 pass
        // recovers whatever readable text the container happens to carry.
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }
    if mime_type.starts_with("text/") || name.ends_with(".txt") || name.ends_with(".md") {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    Ok(String::new())
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Pull the `<w:t>` runs out of `word/document.xml`, one paragraph per
/// `<w:p>`, joined by paragraph breaks so the chunker sees them.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(format!("word/document.xml: {}", e)))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text_run => {
                current.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    if !current.trim().is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n\n"))
}
