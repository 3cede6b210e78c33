//! crates/studyforge_core/src/export.rs
//!
//! Flashcard CSV export: two columns `Front,Back`, RFC4180-style quoting
//! with doubled internal quotes. The format is a compatibility surface, so
//! both directions live here and are pinned by tests.

use crate::domain::Flashcard;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("unterminated quoted field")]
    UnterminatedQuote,
    #[error("expected 2 columns, found {0}")]
    ColumnCount(usize),
}

/// Serializes flashcards with a `Front,Back` header row.
pub fn flashcards_to_csv(cards: &[Flashcard]) -> String {
    let mut out = String::from("Front,Back\r\n");
    for card in cards {
        out.push_str(&escape(&card.front));
        out.push(',');
        out.push_str(&escape(&card.back));
        out.push_str("\r\n");
    }
    out
}

fn escape(field: &str) -> String {
    if field.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parses flashcard CSV, tolerating a missing header row and either line
/// ending.
pub fn flashcards_from_csv(input: &str) -> Result<Vec<Flashcard>, CsvError> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_record(&mut records, &mut fields, &mut field);
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(CsvError::UnterminatedQuote);
    }
    end_record(&mut records, &mut fields, &mut field);

    let mut cards = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if i == 0 && record.len() == 2 && record[0] == "Front" && record[1] == "Back" {
            continue;
        }
        if record.len() != 2 {
            return Err(CsvError::ColumnCount(record.len()));
        }
        cards.push(Flashcard {
            front: record[0].clone(),
            back: record[1].clone(),
        });
    }
    Ok(cards)
}

fn end_record(records: &mut Vec<Vec<String>>, fields: &mut Vec<String>, field: &mut String) {
    if fields.is_empty() && field.is_empty() {
        return; // blank line
    }
    fields.push(std::mem::take(field));
    records.push(std::mem::take(fields));
}
