//! Commit comment policy.

use regex::Regex;

/// Case-insensitive pattern that commit comments must match.
#[derive(Debug, Clone)]
pub struct CommentPolicy {
    pattern: Regex,
}

impl CommentPolicy {
    /// Compile `pattern` with the case-insensitive flag prepended.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("(?i){}", pattern))?,
        })
    }

    /// The compiled pattern text, including the `(?i)` flag.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }

    /// Check a raw comment; surrounding whitespace is ignored.
    ///
    /// Returns the message reported to the client on mismatch.
    pub fn check(&self, comment: &str) -> Result<(), String> {
        let comment = comment.trim();
        if self.pattern.is_match(comment) {
            Ok(())
        } else {
            Err(format!(
                "Commit message {} does not conform to regexp {}.",
                comment,
                self.as_str()
            ))
        }
    }
}
