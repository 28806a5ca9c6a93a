use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;

/// Bytes of UTF-8 per RFC 2047 encoded-word, keeps each word under 75 characters
const ENCODED_WORD_BYTES: usize = 45;
const BODY_LINE_LEN: usize = 76;

/// Plain-text message ready for `users.messages.send`
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMessage {
    /// RFC 5322 message text with a base64 `text/plain` UTF-8 body
    pub fn to_rfc5322(&self) -> String {
        let mut message = String::new();
        message.push_str(&format!("From: {}\r\n", sanitize_header(&self.from)));
        message.push_str(&format!("To: {}\r\n", sanitize_header(&self.to)));
        message.push_str(&format!(
            "Subject: {}\r\n",
            encode_header_value(&sanitize_header(&self.subject))
        ));
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
        message.push_str("Content-Transfer-Encoding: base64\r\n");
        message.push_str("\r\n");
        message.push_str(&wrap_base64(&STANDARD.encode(self.body.as_bytes())));
        message
    }

    /// Value of the `raw` field: the whole message in base64url
    pub fn to_raw(&self) -> String {
        URL_SAFE.encode(self.to_rfc5322().as_bytes())
    }
}

/// Header values never carry line breaks
fn sanitize_header(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// ASCII stays as is, anything else becomes RFC 2047 `B` encoded-words
pub fn encode_header_value(value: &str) -> String {
    if value.is_ascii() {
        return value.to_string();
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_BYTES {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }
    words.join("\r\n ")
}

fn encoded_word(text: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

fn wrap_base64(encoded: &str) -> String {
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / BODY_LINE_LEN * 2 + 2);
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % BODY_LINE_LEN == 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.push(c);
    }
    wrapped.push_str("\r\n");
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(subject: &str, body: &str) -> OutgoingMessage {
        OutgoingMessage {
            from: "me@example.com".to_string(),
            to: "me@example.com".to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn ascii_subject_is_kept() {
        let text = message("Daily Meeting Prereads", "hello").to_rfc5322();
        assert!(text.contains("Subject: Daily Meeting Prereads\r\n"));
        assert!(text.contains("From: me@example.com\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=\"utf-8\"\r\n"));
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let encoded = encode_header_value("No Meetings Today 😊");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
        let inner = encoded.trim_start_matches("=?UTF-8?B?").trim_end_matches("?=");
        let decoded = String::from_utf8(STANDARD.decode(inner).unwrap()).unwrap();
        assert_eq!(decoded, "No Meetings Today 😊");
    }

    #[test]
    fn long_subjects_split_into_words() {
        let encoded = encode_header_value(&"ä".repeat(60));
        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert!(words.len() > 1);
        assert!(words.iter().all(|w| w.len() <= 75));
    }

    #[test]
    fn header_injection_is_neutralized() {
        let text = message("Hi\r\nBcc: evil@example.com", "x").to_rfc5322();
        assert!(!text.contains("\r\nBcc:"));
    }

    #[test]
    fn raw_round_trips_body() {
        let body = "You're all clear today! 🎉\n\nEnjoy your day!";
        let raw = message("s", body).to_raw();
        let text = String::from_utf8(URL_SAFE.decode(raw).unwrap()).unwrap();

        let (_, encoded_body) = text.split_once("\r\n\r\n").unwrap();
        let joined: String = encoded_body.split("\r\n").collect();
        let decoded = String::from_utf8(STANDARD.decode(joined).unwrap()).unwrap();
        assert_eq!(decoded, body);
    }
}
