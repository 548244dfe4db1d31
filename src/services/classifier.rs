//! Failure classification
//!
//! Maps the description of the final upstream failure to a message a user
//! can act on. Rules are evaluated top-down and the first match wins; the
//! result only affects the surfaced text, never control flow.

use super::backend::{EndpointKind, ModelTarget};

/// Prefix of every surfaced failure detail
pub const ERROR_PREFIX: &str = "Error processing request";

/// Case-insensitive substring matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Description contains the needle
    Contains(String),

    /// Description contains at least one of the needles
    AnyOf(Vec<String>),

    /// Description contains every needle
    AllOf(Vec<String>),
}

impl Matcher {
    pub fn contains(needle: &str) -> Self {
        Matcher::Contains(needle.to_lowercase())
    }

    pub fn any_of(needles: &[&str]) -> Self {
        Matcher::AnyOf(needles.iter().map(|n| n.to_lowercase()).collect())
    }

    pub fn all_of(needles: &[&str]) -> Self {
        Matcher::AllOf(needles.iter().map(|n| n.to_lowercase()).collect())
    }

    /// `haystack` must already be lowercase
    fn matches(&self, haystack: &str) -> bool {
        match self {
            Matcher::Contains(needle) => haystack.contains(needle.as_str()),
            Matcher::AnyOf(needles) => needles.iter().any(|n| haystack.contains(n.as_str())),
            Matcher::AllOf(needles) => needles.iter().all(|n| haystack.contains(n.as_str())),
        }
    }
}

/// One `(matcher, message)` pair
///
/// `message` may contain a `{model}` placeholder, replaced with the id of
/// the model whose failure is being classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRule {
    pub matcher: Matcher,
    pub message: String,
    /// Restrict the rule to failures from one kind of endpoint
    pub only_for: Option<EndpointKind>,
}

impl ClassificationRule {
    pub fn new(matcher: Matcher, message: impl Into<String>) -> Self {
        Self {
            matcher,
            message: message.into(),
            only_for: None,
        }
    }

    pub fn only_for(mut self, kind: EndpointKind) -> Self {
        self.only_for = Some(kind);
        self
    }

    fn applies(&self, haystack: &str, target: &ModelTarget) -> bool {
        if let Some(kind) = self.only_for {
            if kind != target.kind {
                return false;
            }
        }
        self.matcher.matches(haystack)
    }
}

/// Ordered rule list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl ErrorClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// User-facing message for a failure, without the common prefix.
    ///
    /// Falls back to the raw description when no rule matches.
    pub fn message_for(&self, description: &str, target: &ModelTarget) -> String {
        let haystack = description.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.applies(&haystack, target))
            .map(|rule| rule.message.replace("{model}", &target.model))
            .unwrap_or_else(|| description.to_string())
    }

    /// Full detail string surfaced to the client
    pub fn classify(&self, description: &str, target: &ModelTarget) -> String {
        format!("{}: {}", ERROR_PREFIX, self.message_for(description, target))
    }
}

/// Rules used unless a deployment supplies its own.
///
/// The local model-not-found and resource rules sit above the generic
/// "model" rule, which would otherwise swallow them.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new(
            Matcher::contains("rate limit"),
            "Rate limit exceeded, try again later (or reduce input size).",
        ),
        ClassificationRule::new(
            Matcher::contains("not found"),
            "{model} not found; ensure it is provisioned (e.g. `ollama pull {model}`).",
        )
        .only_for(EndpointKind::Local),
        ClassificationRule::new(
            Matcher::any_of(&[
                "out of memory",
                "requires more system memory",
                "resource exhausted",
                "runner process has terminated",
            ]),
            "Model failed due to resource limits; try smaller input.",
        ),
        ClassificationRule::new(
            Matcher::contains("model"),
            "Model unavailable or access restricted.",
        ),
    ]
}
