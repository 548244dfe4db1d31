//! Prompt construction
//!
//! The system message carries the PDF context, the question and the
//! behavioral instructions; the user message carries the question alone.

use std::fmt;
use std::str::FromStr;

use crate::schemas::ChatMessage;

/// Exact phrase the strict template asks the model to use for
/// out-of-scope questions
pub const OUT_OF_SCOPE_REPLY: &str = "I can only answer questions about the uploaded PDF.";

/// Instruction template for the system message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PromptTemplate {
    /// Short answers, flags unrelated questions
    #[default]
    Concise,

    /// Answers only from the PDF, quotes it, refuses with a fixed phrase
    Strict,

    /// Free-form template with `{pdf_text}` and `{question}` placeholders
    Custom(String),
}

impl PromptTemplate {
    /// Render the system instruction for the given context and question
    pub fn render(&self, pdf_text: &str, question: &str) -> String {
        match self {
            PromptTemplate::Concise => format!(
                "You are a concise assistant. Below is text from a PDF:\n\n\
                 {pdf_text}\n\n\
                 Question: \"{question}\"\n\n\
                 Answer in 1-2 sentences based on the PDF. \
                 If unrelated, note it's not based on the PDF."
            ),
            PromptTemplate::Strict => format!(
                "You are an assistant that answers strictly from the PDF excerpt below.\n\n\
                 PDF excerpt:\n\
                 \"\"\"\n{pdf_text}\n\"\"\"\n\n\
                 Question: \"{question}\"\n\n\
                 Rules:\n\
                 - Use only information found in the excerpt.\n\
                 - Quote the sentence(s) that support your answer.\n\
                 - If the excerpt does not answer the question, reply exactly: \
                 \"{OUT_OF_SCOPE_REPLY}\""
            ),
            PromptTemplate::Custom(template) => fill_placeholders(template, pdf_text, question),
        }
    }

    /// Build the system/user message pair sent upstream
    pub fn build_messages(&self, pdf_text: &str, question: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.render(pdf_text, question)),
            ChatMessage::user(question),
        ]
    }
}

/// Substitute `{pdf_text}` and `{question}` in one pass; inserted text is
/// never rescanned, and unknown braces are kept as-is
fn fill_placeholders(template: &str, pdf_text: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + pdf_text.len() + question.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix("{pdf_text}") {
            out.push_str(pdf_text);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptTemplate::Concise => write!(f, "concise"),
            PromptTemplate::Strict => write!(f, "strict"),
            PromptTemplate::Custom(_) => write!(f, "custom"),
        }
    }
}

impl FromStr for PromptTemplate {
    type Err = anyhow::Error;

    /// Parses the named styles; custom templates are constructed directly
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concise" => Ok(PromptTemplate::Concise),
            "strict" => Ok(PromptTemplate::Strict),
            _ => anyhow::bail!("Invalid prompt style: {}. Expected: concise or strict", s),
        }
    }
}
