//! Input truncation
//!
//! Oversized fields are cut to a fixed prefix before the prompt is built.
//! Lengths are counted in characters, and a cut never lands inside a
//! multi-byte UTF-8 sequence.

/// Keep at most `max_chars` characters of `s`
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Static truncation choice for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationPolicy {
    /// Forward both fields unmodified
    Disabled,

    /// Keep a fixed prefix of each field
    Prefix { pdf_chars: usize, input_chars: usize },
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        TruncationPolicy::Prefix {
            pdf_chars: 500,
            input_chars: 200,
        }
    }
}

impl TruncationPolicy {
    /// Apply the policy to a request's fields, returning `(pdf_text, user_input)`
    pub fn apply<'a>(&self, pdf_text: &'a str, user_input: &'a str) -> (&'a str, &'a str) {
        match *self {
            TruncationPolicy::Disabled => (pdf_text, user_input),
            TruncationPolicy::Prefix {
                pdf_chars,
                input_chars,
            } => (
                truncate_str(pdf_text, pdf_chars),
                truncate_str(user_input, input_chars),
            ),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, TruncationPolicy::Prefix { .. })
    }
}
