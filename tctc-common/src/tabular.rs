//! Minimal delimited-text reading and writing.
//!
//! Handles what spreadsheet exports actually produce: `;` or `,` separators,
//! a UTF-8 BOM, Windows-1252 bytes, quoted fields with doubled quotes, and
//! CRLF line ends.

use crate::models::RawRow;
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Encoding a file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8Bom,
    Utf8,
    Windows1252,
    Latin1,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8Bom => "utf-8-sig",
            Self::Utf8 => "utf-8",
            Self::Windows1252 => "cp1252",
            Self::Latin1 => "latin-1",
        })
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Windows-1252 code points for 0x80..=0x9F. `None` marks undefined bytes.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
            _ => Some(char::from(b)),
        })
        .collect()
}

/// Decode bytes trying UTF-8 (BOM stripped), Windows-1252, then Latin-1.
/// Latin-1 maps every byte, so this never fails.
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM)
        && let Ok(text) = std::str::from_utf8(rest)
    {
        return (text.to_string(), TextEncoding::Utf8Bom);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), TextEncoding::Utf8);
    }
    if let Some(text) = decode_cp1252(bytes) {
        return (text, TextEncoding::Windows1252);
    }
    (
        bytes.iter().map(|&b| char::from(b)).collect(),
        TextEncoding::Latin1,
    )
}

/// `;` when the header has at least as many `;` as `,`.
pub fn detect_delimiter(header_line: &str) -> char {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons >= commas { ';' } else { ',' }
}

/// Split text into records of raw fields. Blank lines are skipped.
pub fn parse_records(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    let mut end_record = |record: &mut Vec<String>, field: &mut String| {
        record.push(std::mem::take(field));
        let blank = record.len() == 1 && record[0].is_empty();
        if !blank {
            records.push(std::mem::take(record));
        } else {
            record.clear();
        }
    };

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
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_record(&mut record, &mut field);
            }
            '\n' => end_record(&mut record, &mut field),
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        end_record(&mut record, &mut field);
    }
    records
}

/// A parsed table: normalized headers and one map per data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub delimiter: char,
}

/// Parse delimited text with a header row.
///
/// Headers are trimmed and lowercased; values trimmed. Short rows read the
/// missing cells as empty; surplus cells are ignored. Returns `None` when
/// there is no header.
pub fn parse_table(text: &str) -> Option<Table> {
    let first_line = text.lines().next().unwrap_or_default();
    let delimiter = detect_delimiter(first_line);

    let mut records = parse_records(text, delimiter).into_iter();
    let headers: Vec<String> = records
        .next()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    if headers.iter().all(String::is_empty) {
        return None;
    }

    let rows = records
        .map(|record| {
            let mut row = RawRow::new();
            for (idx, header) in headers.iter().enumerate() {
                if header.is_empty() {
                    continue;
                }
                let value = record.get(idx).map(|v| v.trim()).unwrap_or_default();
                row.entry(header.clone()).or_insert_with(|| value.to_string());
            }
            row
        })
        .collect();

    Some(Table {
        headers,
        rows,
        delimiter,
    })
}

/// Quote a field when it contains the delimiter, a quote or a line break.
pub fn escape_field(field: &str, delimiter: char) -> Cow<'_, str> {
    if field.contains([delimiter, '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Render rows as delimited text with `\n` line ends.
pub fn to_delimited<R, F>(header: &[&str], rows: R, delimiter: char) -> String
where
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<str>,
{
    let sep = delimiter.to_string();
    let mut out = header
        .iter()
        .map(|h| escape_field(h, delimiter))
        .collect::<Vec<_>>()
        .join(&sep);
    out.push('\n');
    for row in rows {
        let line = row
            .iter()
            .map(|f| escape_field(f.as_ref(), delimiter).into_owned())
            .collect::<Vec<_>>()
            .join(&sep);
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Write a comma-separated UTF-8 file.
pub fn write_csv<R, F>(path: &Path, header: &[&str], rows: R) -> io::Result<()>
where
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<str>,
{
    fs::write(path, to_delimited(header, rows, ','))
}
