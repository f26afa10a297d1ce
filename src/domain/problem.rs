//! Identifies a single problem statement on the judge.

use std::fmt;

use super::error::DomainError;

/// A contest problem, addressed by numeric contest id and problem label (`A`, `B1`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRef {
    contest_id: u64,
    label: String,
}

impl ProblemRef {
    pub fn new(contest_id: u64, label: impl Into<String>) -> Result<Self, DomainError> {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("problem label must not be empty"));
        }
        if trimmed.contains(['/', '?', '#']) || trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(format!(
                "problem label `{trimmed}` contains characters not allowed in a URL segment"
            )));
        }

        Ok(Self {
            contest_id,
            label: trimmed.to_string(),
        })
    }

    pub fn contest_id(&self) -> u64 {
        self.contest_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Path of the statement page relative to the judge's base URL.
    pub fn page_path(&self) -> String {
        format!("contest/{}/problem/{}", self.contest_id, self.label)
    }

    /// Name of the PDF written for this problem, e.g. `1900A.pdf`.
    pub fn pdf_file_name(&self) -> String {
        format!("{}{}.pdf", self.contest_id, self.label)
    }
}

impl fmt::Display for ProblemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.contest_id, self.label)
    }
}
