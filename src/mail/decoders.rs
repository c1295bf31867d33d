use mailparse::MailHeaderMap;

use crate::domain::event::Message;

const SUBJECT_WIDTH: usize = 120;

pub fn decode_subject(raw: &[u8]) -> String {
    // mailparse expects a full "Key: value" header line
    let mut line = b"Subject: ".to_vec();
    line.extend_from_slice(raw);
    line.extend_from_slice(b"\r\n");

    match mailparse::parse_header(&line) {
        Ok((h, _idx)) => h.get_value(), // decodes RFC 2047
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

/// Subject line for console output.
///
/// Prefers the provider's `subject` field, falls back to the MIME headers.
pub fn display_subject(message: &Message) -> String {
    let subject = if !message.subject.trim().is_empty() {
        decode_subject(message.subject.as_bytes())
    } else {
        header_subject(&message.raw_body).unwrap_or_default()
    };

    let subject = single_line(&subject, SUBJECT_WIDTH);
    if subject.is_empty() {
        "(no subject)".to_string()
    } else {
        subject
    }
}

fn header_subject(raw: &[u8]) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let (headers, _) = mailparse::parse_headers(raw).ok()?;
    headers.get_first_value("Subject")
}

fn single_line(s: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for part in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(part);
        if out.chars().count() >= max_chars {
            break;
        }
    }
    out.chars().take(max_chars).collect()
}
