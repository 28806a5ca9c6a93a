use super::models::MessagePart;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Longest note body kept, in characters
pub const NOTE_CHAR_LIMIT: usize = 2000;
/// Appended to a truncated note
pub const ELLIPSIS: &str = "...";

/// Why a message body could not be turned into text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    Base64,
    Utf8,
}

/// Decode Gmail's base64url, with or without padding
pub fn decode_base64url(data: &str) -> Result<Vec<u8>, BodyError> {
    let trimmed: String = data
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .collect();
    URL_SAFE_NO_PAD
        .decode(trimmed.as_bytes())
        .map_err(|_| BodyError::Base64)
}

fn decode_text(data: &str) -> Result<String, BodyError> {
    let bytes = decode_base64url(data)?;
    String::from_utf8(bytes).map_err(|_| BodyError::Utf8)
}

/// Text of a message payload, preferring a `text/plain` part.
///
/// Order: the first `text/plain` part found depth-first, then the payload's own
/// body, then the first `text/html` part. `Ok(None)` when there is no body at all.
pub fn extract_body(payload: &MessagePart) -> Result<Option<String>, BodyError> {
    if let Some(data) = find_part(payload, "text/plain").and_then(MessagePart::body_data) {
        return decode_text(data).map(Some);
    }
    if let Some(data) = payload.body_data() {
        return decode_text(data).map(Some);
    }
    if let Some(data) = find_part(payload, "text/html").and_then(MessagePart::body_data) {
        return decode_text(data).map(Some);
    }
    Ok(None)
}

fn find_part<'a>(part: &'a MessagePart, mime_type: &str) -> Option<&'a MessagePart> {
    for child in &part.parts {
        if child.mime_type.eq_ignore_ascii_case(mime_type) && child.body_data().is_some() {
            return Some(child);
        }
        if let Some(found) = find_part(child, mime_type) {
            return Some(found);
        }
    }
    None
}

/// Trim, then cut to [`NOTE_CHAR_LIMIT`] characters plus [`ELLIPSIS`] when longer
pub fn truncate_note(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= NOTE_CHAR_LIMIT {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(NOTE_CHAR_LIMIT).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
