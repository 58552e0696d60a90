use regex::Regex;

use skein_core::error::{Result, SkeinError};

/// Categories a legitimate email can be filed under, in match priority.
pub const KNOWN_CATEGORIES: [&str; 5] = ["inquiry", "complaint", "thank you", "request", "information"];

/// Structured reading of a classification response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Verdict {
    pub is_spam: bool,
    /// Only set for legitimate mail.
    pub category: Option<String>,
    /// Only set for spam.
    pub reason: Option<String>,
}

/// Turns the model's free-text answer into a [`Verdict`].
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, response: &str) -> Verdict;
}

/// Keyword classifier over the `type:` / `category:` / `reason:` answer
/// format.
///
/// Matching is case-insensitive. The `type:` line decides spam when present,
/// otherwise the whole answer does; either way "not spam" wins over "spam".
/// Lines may be decorated with list markers or bold (`- **type:** spam`).
pub struct KeywordClassifier {
    field_line: Regex,
    categories: Vec<String>,
}

impl KeywordClassifier {
    pub fn new() -> Result<Self> {
        let field_line = Regex::new(r"(?m)^[\s\-*#]*(type|category|reason)\**\s*:\**\s*(.*)$")
            .map_err(|e| SkeinError::Config(format!("classifier pattern: {}", e)))?;
        Ok(Self {
            field_line,
            categories: KNOWN_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Replace the category list. Order is match priority.
    pub fn with_categories<I, T>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.categories = categories
            .into_iter()
            .map(|c| c.into().to_lowercase())
            .collect();
        self
    }

    /// First value of a `name:` line, lowercased text assumed.
    fn field<'t>(&self, text: &'t str, name: &str) -> Option<&'t str> {
        self.field_line
            .captures_iter(text)
            .find(|c| c.get(1).map(|m| m.as_str()) == Some(name))
            .and_then(|c| c.get(2))
            .map(|m| m.as_str().trim())
    }

    fn first_category(&self, text: &str) -> Option<String> {
        self.categories
            .iter()
            .find(|c| text.contains(c.as_str()))
            .cloned()
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, response: &str) -> Verdict {
        let text = response.to_lowercase();

        let decision = self.field(&text, "type").unwrap_or(&text);
        let is_spam = decision.contains("spam") && !decision.contains("not spam");

        if is_spam {
            let reason = text
                .split_once("reason:")
                .map(|(_, rest)| rest.trim_start_matches('*').trim().to_string())
                .filter(|r| !r.is_empty());
            return Verdict {
                is_spam,
                category: None,
                reason,
            };
        }

        let category = self
            .field(&text, "category")
            .and_then(|line| self.first_category(line))
            .or_else(|| self.first_category(&text));

        Verdict {
            is_spam,
            category,
            reason: None,
        }
    }
}
