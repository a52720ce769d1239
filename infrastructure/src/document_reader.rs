use anyhow::{anyhow, Context};
use docx_rs::{read_docx, DocumentChild};
use memmap2::Mmap;
use shared::types::Result;
use std::fs::File;
use std::path::Path;

pub(crate) const HTML_WRAP_WIDTH: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Html,
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" => DocumentKind::Html,
            "pdf" => DocumentKind::Pdf,
            "docx" => DocumentKind::Docx,
            _ => DocumentKind::Text,
        }
    }
}

/// Extract plain text from a knowledge-base document.
pub fn read_document(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        return Ok(String::new());
    }
    let mmap = unsafe { Mmap::map(&file)? };
    extract_text(DocumentKind::from_path(path), &mmap)
        .with_context(|| format!("extracting text from {}", path.display()))
}

pub fn extract_text(kind: DocumentKind, bytes: &[u8]) -> Result<String> {
    match kind {
        // Lossy conversion ensures non-UTF8 bytes don't crash scanning.
        DocumentKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
        DocumentKind::Html => Ok(html2text::from_read(bytes, HTML_WRAP_WIDTH)),
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| anyhow!("pdf: {e}"))
        }
        DocumentKind::Docx => {
            let docx = read_docx(bytes).map_err(|e| anyhow!("docx: {e}"))?;
            let mut text = String::new();
            for child in &docx.document.children {
                // Tables and other block types are skipped.
                if let DocumentChild::Paragraph(p) = child {
                    text.push_str(&p.raw_text());
                    text.push_str("\n\n");
                }
            }
            Ok(text)
        }
    }
}
