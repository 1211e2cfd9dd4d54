// 🔎 Findings - What a scan reports back
// One finding per matched rule; consumed by the letter generator

use serde::{Deserialize, Serialize};

/// A suspected reporting violation detected in a scanned document.
///
/// Findings are values: produced by the scan pipeline, never mutated and
/// never persisted. They live for one scan session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Short headline, e.g. "Inaccurate Late Payment"
    pub title: String,

    /// Statute or section cited, e.g. "15 USC 1681i"
    pub code: String,

    /// One-line explanation shown under the title
    pub text: String,

    /// Optional pointer into the consumer-law reference
    #[serde(default, rename = "consumerLaw", skip_serializing_if = "Option::is_none")]
    pub law_reference: Option<String>,
}

impl Finding {
    pub fn new(title: &str, code: &str, text: &str) -> Self {
        Finding {
            title: title.to_string(),
            code: code.to_string(),
            text: text.to_string(),
            law_reference: None,
        }
    }

    pub fn with_law_reference(mut self, law: &str) -> Self {
        self.law_reference = Some(law.to_string());
        self
    }

    /// File-name friendly slug of the title ("Charge-Off Violation" -> "charge-off-violation").
    ///
    /// Each whitespace run becomes one '-', leading and trailing runs included.
    /// Anything outside `[a-z0-9-]` is dropped so the name is safe in paths and headers.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.title.len());
        let mut in_space = false;

        for c in self.title.to_lowercase().chars() {
            if c.is_whitespace() {
                if !in_space {
                    slug.push('-');
                }
                in_space = true;
                continue;
            }
            in_space = false;
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                slug.push(c);
            }
        }

        slug
    }
}
