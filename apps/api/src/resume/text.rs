//! Plain-text extraction from uploaded résumé files.

use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("unsupported file type '{0}' (expected .pdf, .docx or .txt)")]
    UnsupportedFormat(String),

    #[error("could not read PDF: {0}")]
    Pdf(String),

    #[error("could not read DOCX: {0}")]
    Docx(String),

    #[error("no text could be extracted from the file")]
    Empty,
}

impl From<ResumeError> for AppError {
    fn from(e: ResumeError) -> Self {
        match e {
            ResumeError::UnsupportedFormat(_) => AppError::Validation(e.to_string()),
            _ => AppError::UnprocessableEntity(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Docx,
    Text,
}

impl ResumeFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, ResumeError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(ResumeFormat::Pdf),
            "docx" => Ok(ResumeFormat::Docx),
            "txt" | "text" => Ok(ResumeFormat::Text),
            _ => Err(ResumeError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// Extracts text and rejects files that yield nothing but whitespace.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, ResumeError> {
    let text = match ResumeFormat::from_file_name(file_name)? {
        ResumeFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ResumeError::Pdf(e.to_string()))?,
        ResumeFormat::Docx => docx_text(bytes)?,
        ResumeFormat::Text => String::from_utf8_lossy(bytes).into_owned(),
    };

    if text.trim().is_empty() {
        return Err(ResumeError::Empty);
    }
    Ok(text.replace("\r\n", "\n"))
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// Reads `word/document.xml` and flattens it: paragraphs and breaks become newlines,
/// tabs become tabs, every other tag is dropped.
pub fn docx_text(bytes: &[u8]) -> Result<String, ResumeError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ResumeError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ResumeError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ResumeError::Docx(e.to_string()))?;

    let xml = xml
        .replace("</w:p>", "\n")
        .replace("<w:br/>", "\n")
        .replace("<w:tab/>", "\t");
    let stripped = tag_pattern().replace_all(&xml, "");

    Ok(unescape_xml(&stripped))
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use zip::write::SimpleFileOptions;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(document_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_format_is_chosen_by_extension() {
        assert_eq!(ResumeFormat::from_file_name("CV.PDF").unwrap(), ResumeFormat::Pdf);
        assert_eq!(ResumeFormat::from_file_name("cv.docx").unwrap(), ResumeFormat::Docx);
        assert_eq!(ResumeFormat::from_file_name("cv.txt").unwrap(), ResumeFormat::Text);
        assert!(matches!(
            ResumeFormat::from_file_name("cv.doc"),
            Err(ResumeError::UnsupportedFormat(_))
        ));
        assert!(ResumeFormat::from_file_name("resume").is_err());
    }

    #[test]
    fn test_plain_text_normalises_line_endings() {
        let text = extract_text("cv.txt", b"Jane Doe\r\nSkills: Rust\r\n").unwrap();
        assert_eq!(text, "Jane Doe\nSkills: Rust\n");
    }

    #[test]
    fn test_whitespace_only_file_is_rejected() {
        assert!(matches!(extract_text("cv.txt", b"  \n\t "), Err(ResumeError::Empty)));
    }

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body>
            <w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>
            <w:p><w:r><w:t>R&amp;D Engineer</w:t><w:tab/><w:t>2020</w:t></w:r></w:p>
            </w:body></w:document>"#;
        let text = extract_text("cv.docx", &docx_bytes(xml)).unwrap();
        let lines: Vec<_> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(lines, vec!["Jane Doe", "R&D Engineer\t2020"]);
    }

    #[test]
    fn test_corrupt_docx_is_an_error() {
        assert!(matches!(
            extract_text("cv.docx", b"not a zip"),
            Err(ResumeError::Docx(_))
        ));
    }
}
