use crate::error::ExtractionError;
use crate::models::document::{
    ContentStats, DocumentFormat, ExtractedText, SourceContent, SourceDocument, SourceRef,
};
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

type ExtractResult<T> = std::result::Result<T, ExtractionError>;

#[derive(Clone, Debug)]
pub struct ExtractService {
    min_content_length: usize,
}

impl ExtractService {
    pub fn new(min_content_length: usize) -> Self {
        Self { min_content_length }
    }

    pub fn min_content_length(&self) -> usize {
        self.min_content_length
    }

    /// Formats whose parser is compiled into this build.
    pub fn supported_formats() -> Vec<DocumentFormat> {
        DocumentFormat::ALL
            .into_iter()
            .filter(|f| is_format_available(*f))
            .collect()
    }

    pub fn extract(&self, source: &SourceDocument) -> ExtractResult<ExtractedText> {
        let raw = match &source.content {
            SourceContent::Pasted(text) => text.clone(),
            SourceContent::File { format, data } => {
                if !is_format_available(*format) {
                    return Err(ExtractionError::UnsupportedFormat(format.as_str().to_string()));
                }
                match format {
                    DocumentFormat::Txt => decode_text(data)?,
                    DocumentFormat::Pdf => extract_pdf(data)?,
                    DocumentFormat::Docx => extract_docx(data)?,
                    DocumentFormat::Csv => summarize_csv(data)?,
                }
            }
        };

        let text = normalize_text(&raw);
        let char_count = text.chars().count();
        if char_count < self.min_content_length {
            return Err(ExtractionError::TooShort {
                min: self.min_content_length,
                actual: char_count,
            });
        }

        tracing::info!(
            origin = %source.origin,
            format = source.format().map(|f| f.as_str()).unwrap_or("pasted"),
            chars = char_count,
            "Extracted text"
        );

        Ok(ExtractedText {
            text,
            source: SourceRef {
                origin: source.origin.clone(),
                format: source.format(),
            },
            char_count,
        })
    }
}

pub fn is_format_available(format: DocumentFormat) -> bool {
    match format {
        DocumentFormat::Txt | DocumentFormat::Docx => true,
        DocumentFormat::Pdf => cfg!(feature = "pdf"),
        DocumentFormat::Csv => cfg!(feature = "csv"),
    }
}

/// Unifies line endings, strips trailing spaces and collapses runs of blank
/// lines into a single blank line.
pub fn normalize_text(input: &str) -> String {
    let unified = input
        .replace("\r\n", "\n")
        .replace(['\r', '\u{000C}'], "\n")
        .replace('\u{0000}', "");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in unified.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        blank_run = 0;
        out.push_str(line);
    }
    out.trim().to_string()
}

pub fn content_stats(text: &str) -> ContentStats {
    ContentStats {
        characters: text.chars().count(),
        words: text.split_whitespace().count(),
        sentences: text.split('.').filter(|s| !s.trim().is_empty()).count(),
        paragraphs: text
            .replace("\r\n", "\n")
            .split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .count(),
    }
}

/// UTF-8 first, then BOM-marked UTF-16, then Latin-1 for anything that does
/// not look binary.
fn decode_text(data: &[u8]) -> ExtractResult<String> {
    let without_bom = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if let Ok(text) = std::str::from_utf8(without_bom) {
        return Ok(text.to_string());
    }

    if let Some(text) = decode_utf16_with_bom(data) {
        return Ok(text);
    }

    let looks_binary = data
        .iter()
        .any(|b| *b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C));
    if looks_binary {
        return Err(ExtractionError::Encoding);
    }

    Ok(data.iter().map(|b| *b as char).collect())
}

fn decode_utf16_with_bom(data: &[u8]) -> Option<String> {
    let (body, little_endian) = if let Some(rest) = data.strip_prefix(&[0xFF, 0xFE]) {
        (rest, true)
    } else if let Some(rest) = data.strip_prefix(&[0xFE, 0xFF]) {
        (rest, false)
    } else {
        return None;
    };

    if body.len() % 2 != 0 {
        return None;
    }

    let units = body.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });

    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

#[cfg(feature = "pdf")]
fn extract_pdf(data: &[u8]) -> ExtractResult<String> {
    if !data.starts_with(b"%PDF") {
        return Err(ExtractionError::Malformed {
            format: "PDF",
            cause: "not a PDF document".to_string(),
        });
    }

    // The parser panics on some malformed inputs.
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data));
    let text = match outcome {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            return Err(ExtractionError::Malformed {
                format: "PDF",
                cause: e.to_string(),
            })
        }
        Err(_) => {
            tracing::error!("PDF parser panicked");
            return Err(ExtractionError::Malformed {
                format: "PDF",
                cause: "the document structure could not be parsed".to_string(),
            });
        }
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyContent("PDF"));
    }
    Ok(text)
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_data: &[u8]) -> ExtractResult<String> {
    Err(ExtractionError::UnsupportedFormat("pdf".to_string()))
}

/// Non-empty paragraphs in document order, then table rows with cells
/// joined by " | ".
fn extract_docx(data: &[u8]) -> ExtractResult<String> {
    let docx = docx_rs::read_docx(data).map_err(|e| ExtractionError::Malformed {
        format: "DOCX",
        cause: e.to_string(),
    })?;

    let mut blocks: Vec<String> = Vec::new();
    let mut table_rows: Vec<String> = Vec::new();

    for child in docx.document.children.iter() {
        match child {
            DocumentChild::Paragraph(para) => {
                let text = paragraph_text(para);
                if !text.trim().is_empty() {
                    blocks.push(text);
                }
            }
            DocumentChild::Table(table) => collect_table_rows(table, &mut table_rows),
            _ => {}
        }
    }

    blocks.extend(table_rows);
    let text = blocks.join("\n\n");
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyContent("DOCX"));
    }
    Ok(text)
}

fn paragraph_text(para: &Paragraph) -> String {
    para.children
        .iter()
        .filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run_text(run)),
            _ => None,
        })
        .collect()
}

fn run_text(run: &Run) -> String {
    run.children
        .iter()
        .filter_map(|child| match child {
            RunChild::Text(t) => Some(t.text.as_str()),
            RunChild::Tab(_) => Some("\t"),
            _ => None,
        })
        .collect()
}

fn collect_table_rows(table: &Table, out: &mut Vec<String>) {
    for row_child in &table.rows {
        let row = match row_child {
            TableChild::TableRow(row) => row,
        };
        let mut cells: Vec<String> = Vec::new();
        for cell_child in &row.cells {
            if let TableRowChild::TableCell(cell) = cell_child {
                let text = cell
                    .children
                    .iter()
                    .filter_map(|content| match content {
                        TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                let text = text.trim();
                if !text.is_empty() {
                    cells.push(text.to_string());
                }
            }
        }
        if !cells.is_empty() {
            out.push(cells.join(" | "));
        }
    }
}

#[cfg(feature = "csv")]
#[derive(Default)]
struct ColumnSummary {
    non_empty: usize,
    numeric: usize,
    min: f64,
    max: f64,
    sum: f64,
    samples: Vec<String>,
}

/// Renders a table as prose: shape, per-column statistics and a few sample
/// rows. The result is question material, not a literal transcript.
#[cfg(feature = "csv")]
fn summarize_csv(data: &[u8]) -> ExtractResult<String> {
    const SAMPLE_ROWS: usize = 5;
    const SAMPLE_VALUES: usize = 3;

    let malformed = |e: csv::Error| ExtractionError::Malformed {
        format: "CSV",
        cause: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(malformed)?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ExtractionError::EmptyContent("CSV"));
    }

    let mut columns: Vec<ColumnSummary> = headers.iter().map(|_| ColumnSummary::default()).collect();
    let mut sample: Vec<csv::StringRecord> = Vec::new();
    let mut row_count = 0usize;

    for record in reader.records() {
        let record = record.map_err(malformed)?;
        row_count += 1;
        for (field, col) in record.iter().zip(columns.iter_mut()) {
            if field.is_empty() {
                continue;
            }
            col.non_empty += 1;
            match field.parse::<f64>() {
                Ok(v) if v.is_finite() => {
                    if col.numeric == 0 {
                        col.min = v;
                        col.max = v;
                    } else {
                        col.min = col.min.min(v);
                        col.max = col.max.max(v);
                    }
                    col.numeric += 1;
                    col.sum += v;
                }
                _ => {
                    if col.samples.len() < SAMPLE_VALUES && !col.samples.iter().any(|s| s == field) {
                        col.samples.push(field.to_string());
                    }
                }
            }
        }
        if sample.len() < SAMPLE_ROWS {
            sample.push(record);
        }
    }

    let mut lines: Vec<String> = vec![format!(
        "The dataset contains {} rows and {} columns: {}.",
        row_count,
        headers.len(),
        headers.join(", ")
    )];

    for (name, col) in headers.iter().zip(&columns) {
        if col.non_empty == 0 {
            lines.push(format!("The column {} has no values.", name));
        } else if col.numeric == col.non_empty {
            lines.push(format!(
                "The column {} is numeric, with values ranging from {} to {} and an average of {:.2}.",
                name,
                format_number(col.min),
                format_number(col.max),
                col.sum / col.numeric as f64
            ));
        } else {
            lines.push(format!(
                "The column {} contains text values such as {}.",
                name,
                col.samples.join(", ")
            ));
        }
    }

    if !sample.is_empty() {
        lines.push(String::new());
        for (idx, record) in sample.iter().enumerate() {
            let fields: Vec<String> = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, v)| !v.is_empty())
                .map(|(h, v)| format!("{} is {}", h, v))
                .collect();
            lines.push(format!("In row {}, {}.", idx + 1, fields.join(", ")));
        }
    }

    Ok(lines.join("\n"))
}

#[cfg(feature = "csv")]
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(not(feature = "csv"))]
fn summarize_csv(_data: &[u8]) -> ExtractResult<String> {
    Err(ExtractionError::UnsupportedFormat("csv".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, TableCell, TableRow};

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    fn cell(text: &str) -> TableCell {
        TableCell::new().add_paragraph(para(text))
    }

    fn packed(doc: Docx) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        doc.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn docx_table_rows_follow_paragraphs() {
        let table = Table::new(vec![
            TableRow::new(vec![cell("Element"), cell("Symbol")]),
            TableRow::new(vec![cell("Oxygen"), cell("O")]),
            TableRow::new(vec![cell(""), cell("  ")]),
        ]);
        let doc = Docx::new()
            .add_paragraph(para("Periodic table notes"))
            .add_table(table)
            .add_paragraph(para("Noble gases rarely react."));

        let text = extract_docx(&packed(doc)).unwrap();
        assert_eq!(
            text,
            "Periodic table notes\n\nNoble gases rarely react.\n\nElement | Symbol\n\nOxygen | O"
        );
    }

    #[test]
    fn docx_without_text_is_empty_content() {
        let doc = Docx::new().add_paragraph(para("   "));
        assert!(matches!(
            extract_docx(&packed(doc)),
            Err(ExtractionError::EmptyContent("DOCX"))
        ));
    }

    #[cfg(feature = "csv")]
    #[test]
    fn csv_is_summarised_as_prose() {
        let data = b"name,age,city\nAda,36,London\nAlan,41,Wilmslow\nGrace,85,New York\n";
        let text = summarize_csv(data).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "The dataset contains 3 rows and 3 columns: name, age, city.");
        assert_eq!(lines[1], "The column name contains text values such as Ada, Alan, Grace.");
        assert_eq!(
            lines[2],
            "The column age is numeric, with values ranging from 36 to 85 and an average of 54.00."
        );
        assert_eq!(lines[3], "The column city contains text values such as London, Wilmslow, New York.");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "In row 1, name is Ada, age is 36, city is London.");
        assert_eq!(lines[7], "In row 3, name is Grace, age is 85, city is New York.");
        assert_eq!(lines.len(), 8);
    }

    #[cfg(feature = "csv")]
    #[test]
    fn csv_with_blank_header_is_empty_content() {
        assert!(matches!(
            summarize_csv(b",,\n1,2,3\n"),
            Err(ExtractionError::EmptyContent("CSV"))
        ));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn non_pdf_bytes_are_malformed() {
        let err = extract_pdf(b"PK\x03\x04 this is a zip archive").unwrap_err();
        assert!(matches!(err, ExtractionError::Malformed { format: "PDF", .. }));

        let service = ExtractService::new(10);
        let source = SourceDocument::file("notes.pdf", DocumentFormat::Pdf, b"plain text pretending".to_vec());
        let err = service.extract(&source).unwrap_err();
        assert!(err.to_string().starts_with("Error reading PDF file"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn truncated_pdf_never_yields_text() {
        let err = extract_pdf(b"%PDF-1.4\nno objects and no trailer").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Malformed { format: "PDF", .. } | ExtractionError::EmptyContent("PDF")
        ));
    }

    #[test]
    fn normalize_collapses_blank_runs() {
        let raw = "  Title\r\n\r\n\r\n\r\nFirst line   \nSecond line\n\n\n";
        assert_eq!(normalize_text(raw), "Title\n\nFirst line\nSecond line");
    }

    #[test]
    fn latin1_fallback_decodes_legacy_bytes() {
        let bytes = b"Caf\xe9 au lait";
        assert_eq!(decode_text(bytes).unwrap(), "Caf\u{e9} au lait");
    }

    #[test]
    fn binary_bytes_fail_decoding() {
        let bytes = [0x00, 0x01, 0xff, 0xfe, 0x02, 0x80];
        assert!(matches!(decode_text(&bytes), Err(ExtractionError::Encoding)));
    }

    #[test]
    fn utf16_with_bom_is_decoded() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Hello".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes).unwrap(), "Hello");
    }
}
