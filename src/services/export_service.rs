use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionKind};
use crate::models::quiz_session::QuizSession;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use rust_xlsxwriter::*;
use serde::Serialize;
use std::io::Cursor;

const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Text,
    Docx,
    Xlsx,
}

impl ExportFormat {
    /// `None` means plain text.
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("text") | Some("txt") => Ok(ExportFormat::Text),
            Some("docx") | Some("document") => Ok(ExportFormat::Docx),
            Some("xlsx") => Ok(ExportFormat::Xlsx),
            Some(other) => Err(Error::BadRequest(format!(
                "Unknown export format '{}'. Use text, docx or xlsx.",
                other
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Docx => "docx",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

/// Rendered on demand from the current question list; never cached.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct ExportService;

/// Cell text of the two workbook sheets, one entry per question in session
/// order. The leading "#" column is written separately as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRows {
    pub questions: Vec<Vec<String>>,
    pub answer_key: Vec<Vec<String>>,
}

impl ExportService {
    /// Every question appears once in the body and once in the answer key,
    /// both in session order.
    pub fn export(session: &QuizSession, format: ExportFormat) -> Result<ExportArtifact> {
        let questions = session.list();
        let bytes = match format {
            ExportFormat::Text => Self::render_text(questions).into_bytes(),
            ExportFormat::Docx => Self::render_docx(questions)?,
            ExportFormat::Xlsx => Self::render_xlsx(questions)?,
        };

        tracing::info!(
            session_id = %session.id,
            format = format.extension(),
            questions = questions.len(),
            bytes = bytes.len(),
            "Quiz exported"
        );

        Ok(ExportArtifact {
            format,
            file_name: format!("quiz.{}", format.extension()),
            content_type: format.content_type(),
            bytes,
        })
    }

    pub fn render_text(questions: &[Question]) -> String {
        let mut out = String::new();
        out.push_str("QUIZ\n");
        out.push_str(&"=".repeat(60));
        out.push_str("\n\nQUESTIONS\n");
        out.push_str(&"-".repeat(60));
        out.push('\n');

        for (idx, q) in questions.iter().enumerate() {
            out.push_str(&format!("\n{}. [{}] {}\n", idx + 1, q.kind.label(), q.prompt));
            match q.kind {
                QuestionKind::MultipleChoice => {
                    for (letter, option) in OPTION_LETTERS.iter().zip(&q.options) {
                        out.push_str(&format!("   {}) {}\n", letter, option));
                    }
                }
                QuestionKind::TrueFalse => out.push_str("   True / False\n"),
            }
        }

        out.push_str("\n\nANSWER KEY\n");
        out.push_str(&"-".repeat(60));
        out.push('\n');

        for (idx, q) in questions.iter().enumerate() {
            out.push_str(&format!("\n{}. {}\n", idx + 1, answer_label(q)));
            if let Some(explanation) = &q.explanation {
                out.push_str(&format!("   Explanation: {}\n", explanation));
            }
        }

        out
    }

    pub fn render_docx(questions: &[Question]) -> Result<Vec<u8>> {
        let heading = |text: &str| Paragraph::new().add_run(Run::new().add_text(text).bold().size(32));

        let mut doc = Docx::new()
            .add_paragraph(heading("Quiz"))
            .add_paragraph(heading("Questions"));

        for (idx, q) in questions.iter().enumerate() {
            doc = doc.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(format!("{}. ", idx + 1)).bold())
                    .add_run(Run::new().add_text(format!("[{}] ", q.kind.label())).italic())
                    .add_run(Run::new().add_text(q.prompt.as_str())),
            );
            match q.kind {
                QuestionKind::MultipleChoice => {
                    for (letter, option) in OPTION_LETTERS.iter().zip(&q.options) {
                        doc = doc.add_paragraph(
                            Paragraph::new().add_run(Run::new().add_text(format!("    {}) {}", letter, option))),
                        );
                    }
                }
                QuestionKind::TrueFalse => {
                    doc = doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text("    True / False")));
                }
            }
        }

        doc = doc
            .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)))
            .add_paragraph(heading("Answer Key"));

        for (idx, q) in questions.iter().enumerate() {
            doc = doc.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(format!("{}. ", idx + 1)).bold())
                    .add_run(Run::new().add_text(answer_label(q))),
            );
            if let Some(explanation) = &q.explanation {
                doc = doc.add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text(format!("    Explanation: {}", explanation)).italic()),
                );
            }
        }

        let mut cursor = Cursor::new(Vec::new());
        doc.build()
            .pack(&mut cursor)
            .map_err(|e| Error::Export(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    pub fn sheet_rows(questions: &[Question]) -> SheetRows {
        let question_rows = questions
            .iter()
            .map(|q| {
                let mut row = vec![q.kind.label().to_string(), q.prompt.clone()];
                row.extend(q.options.iter().cloned());
                row
            })
            .collect();
        let answer_rows = questions
            .iter()
            .map(|q| vec![answer_label(q), q.explanation.clone().unwrap_or_default()])
            .collect();
        SheetRows {
            questions: question_rows,
            answer_key: answer_rows,
        }
    }

    pub fn render_xlsx(questions: &[Question]) -> Result<Vec<u8>> {
        let rows = Self::sheet_rows(questions);
        let mut workbook = Workbook::new();

        let header_bg = Color::RGB(0x0F172A);
        let border_color = Color::RGB(0xE2E8F0);
        let alt_row = Color::RGB(0xF8FAFC);
        let correct_color = Color::RGB(0x10B981);

        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let row_format = |idx: usize| {
            let bg = if idx % 2 == 0 { alt_row } else { Color::White };
            Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap()
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color)
        };

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Questions")?;
            let columns = [
                ("#", 6.0),
                ("Type", 16.0),
                ("Question", 60.0),
                ("A", 24.0),
                ("B", 24.0),
                ("C", 24.0),
                ("D", 24.0),
            ];
            for (col, (name, width)) in columns.iter().enumerate() {
                sheet.set_column_width(col as u16, *width)?;
                sheet.write_string_with_format(0, col as u16, *name, &header_format)?;
            }

            for (idx, cells) in rows.questions.iter().enumerate() {
                let row = idx as u32 + 1;
                let fmt = row_format(idx);
                sheet.write_number_with_format(row, 0, (idx + 1) as f64, &fmt)?;
                for (col, cell) in cells.iter().enumerate() {
                    sheet.write_string_with_format(row, 1 + col as u16, cell, &fmt)?;
                }
            }
        }

        {
            let sheet = workbook.add_worksheet();
            sheet.set_name("Answer Key")?;
            let columns = [("#", 6.0), ("Answer", 40.0), ("Explanation", 80.0)];
            for (col, (name, width)) in columns.iter().enumerate() {
                sheet.set_column_width(col as u16, *width)?;
                sheet.write_string_with_format(0, col as u16, *name, &header_format)?;
            }

            for (idx, cells) in rows.answer_key.iter().enumerate() {
                let row = idx as u32 + 1;
                let fmt = row_format(idx);
                let answer_fmt = fmt.clone().set_bold().set_font_color(correct_color);
                sheet.write_number_with_format(row, 0, (idx + 1) as f64, &fmt)?;
                if let [answer, explanation] = cells.as_slice() {
                    sheet.write_string_with_format(row, 1, answer, &answer_fmt)?;
                    sheet.write_string_with_format(row, 2, explanation, &fmt)?;
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

/// "B) Carbon dioxide" for multiple choice, "True"/"False" otherwise.
fn answer_label(q: &Question) -> String {
    match q.kind {
        QuestionKind::MultipleChoice => {
            let letter = OPTION_LETTERS.get(q.correct_index).copied().unwrap_or('?');
            format!("{}) {}", letter, q.correct_option())
        }
        QuestionKind::TrueFalse => q.correct_option().to_string(),
    }
}
