//! Pre-filled `mailto:` links carrying a truncated report preview.
//!
//! Nothing is sent from here; the link only opens the user's mail composer.

/// Appended to a preview that was cut short.
pub const CONTINUATION: &str = "\n\n...(truncated)";

/// First `limit` characters of `text`, plus [`CONTINUATION`] when anything
/// was dropped. Counts Unicode scalar values, not bytes.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{CONTINUATION}", &text[..cut]),
        None => text.to_string(),
    }
}

pub struct MailDraft<'a> {
    pub recipient: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

impl MailDraft<'_> {
    /// `None` when there is no recipient to address.
    pub fn to_link(&self) -> Option<String> {
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return None;
        }
        Some(format!(
            "mailto:{}?subject={}&body={}",
            recipient,
            urlencoding::encode(self.subject),
            urlencoding::encode(self.body)
        ))
    }
}

/// Build the summary body: a heading line followed by the preview.
pub fn summary_body(heading: &str, raw_text: &str, preview_chars: usize) -> String {
    format!("{heading}\n\n{}", preview(raw_text, preview_chars))
}
