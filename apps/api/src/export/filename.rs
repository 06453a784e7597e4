//! Download file naming: `{lastName}_{firstName}_CV.pdf`.

use crate::models::CvDocument;

pub const FALLBACK_FIRST_NAME: &str = "John";
pub const FALLBACK_LAST_NAME: &str = "Doe";

/// Builds the export file name from the document's personal info.
///
/// A missing `personalInfo`, or a blank first/last name, falls back to the
/// placeholder for that part. Path separators, quotes and control characters
/// are replaced with `_`.
pub fn export_file_name(doc: &CvDocument) -> String {
    let (first, last) = match &doc.personal_info {
        Some(info) => (info.first_name.as_str(), info.last_name.as_str()),
        None => ("", ""),
    };

    let first = name_part(first, FALLBACK_FIRST_NAME);
    let last = name_part(last, FALLBACK_LAST_NAME);
    format!("{last}_{first}_CV.pdf")
}

fn name_part(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '"' | '*' | '?' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `Content-Disposition` value for a download.
///
/// Carries an ASCII `filename` for old clients and an RFC 5987 `filename*`
/// with the exact UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}
