use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Txt,
    Pdf,
    Docx,
    Csv,
}

impl DocumentFormat {
    pub const ALL: [DocumentFormat; 4] = [
        DocumentFormat::Txt,
        DocumentFormat::Pdf,
        DocumentFormat::Docx,
        DocumentFormat::Csv,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Txt => "txt",
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Csv => "csv",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentFormat::Txt => "TXT",
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::Csv => "CSV",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "txt" | "text" | "md" => Some(DocumentFormat::Txt),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "csv" => Some(DocumentFormat::Csv),
            _ => None,
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Raw input as received. Discarded once extraction has run.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub origin: String,
    pub content: SourceContent,
}

#[derive(Debug, Clone)]
pub enum SourceContent {
    File { format: DocumentFormat, data: Bytes },
    Pasted(String),
}

impl SourceDocument {
    pub fn file(origin: impl Into<String>, format: DocumentFormat, data: impl Into<Bytes>) -> Self {
        Self {
            origin: origin.into(),
            content: SourceContent::File {
                format,
                data: data.into(),
            },
        }
    }

    pub fn pasted(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            content: SourceContent::Pasted(text.into()),
        }
    }

    pub fn format(&self) -> Option<DocumentFormat> {
        match &self.content {
            SourceContent::File { format, .. } => Some(*format),
            SourceContent::Pasted(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub origin: String,
    /// `None` for pasted text.
    pub format: Option<DocumentFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub source: SourceRef,
    pub char_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStats {
    pub characters: usize,
    pub words: usize,
    pub sentences: usize,
    pub paragraphs: usize,
}
