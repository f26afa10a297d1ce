//! Formula values extracted from statement markup and the embeds rendered for them.

use std::collections::{HashMap, HashSet};

use super::error::DomainError;

/// A LaTeX formula as it appears in the statement.
///
/// Equality and hashing are by value: the same text delimited as inline and
/// as display math yields two distinct formulas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formula {
    content: String,
    is_inline: bool,
}

impl Formula {
    pub fn inline(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_inline: true,
        }
    }

    pub fn display(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_inline: false,
        }
    }

    /// LaTeX source with HTML entities already decoded.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_inline(&self) -> bool {
        self.is_inline
    }
}

/// Ordered set of formulas submitted to a renderer: inline formulas first,
/// then display formulas, each class in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaBatch {
    formulas: Vec<Formula>,
}

impl FormulaBatch {
    pub fn new(
        inline: impl IntoIterator<Item = Formula>,
        display: impl IntoIterator<Item = Formula>,
    ) -> Self {
        let mut seen = HashSet::new();
        let formulas = inline
            .into_iter()
            .chain(display)
            .filter(|formula| seen.insert(formula.clone()))
            .collect();
        Self { formulas }
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Formula> {
        self.formulas.iter()
    }

    pub fn as_slice(&self) -> &[Formula] {
        &self.formulas
    }

    /// Correlate renderer output with the batch positionally.
    ///
    /// Fails when the renderer produced a different number of embeds than
    /// formulas were submitted.
    pub fn pair_with(&self, embeds: Vec<String>) -> Result<EmbedMap, DomainError> {
        if embeds.len() != self.formulas.len() {
            return Err(DomainError::invariant(format!(
                "renderer produced {} embeds for {} formulas",
                embeds.len(),
                self.formulas.len()
            )));
        }

        Ok(EmbedMap(
            self.formulas.iter().cloned().zip(embeds).collect(),
        ))
    }
}

impl<'a> IntoIterator for &'a FormulaBatch {
    type Item = &'a Formula;
    type IntoIter = std::slice::Iter<'a, Formula>;

    fn into_iter(self) -> Self::IntoIter {
        self.formulas.iter()
    }
}

/// Rendered embed for every formula of a batch, keyed by formula value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedMap(HashMap<Formula, String>);

impl EmbedMap {
    pub fn get(&self, formula: &Formula) -> Option<&str> {
        self.0.get(formula).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
