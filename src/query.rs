use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    /// Every term must match.
    #[default]
    And,
    /// Any term may match.
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Filename,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub terms: Vec<String>,
    pub combinator: Combinator,
    pub scope: Scope,
}

impl Query {
    /// Builds a query from raw input, or `None` when the input has no terms.
    pub fn parse(raw: &str, combinator: Combinator, scope: Scope) -> Option<Self> {
        let terms = tokenize(raw);
        if terms.is_empty() {
            return None;
        }
        Some(Self {
            terms,
            combinator,
            scope,
        })
    }

    pub fn use_and_logic(&self) -> bool {
        self.combinator == Combinator::And
    }

    pub fn search_in_filenames(&self) -> bool {
        self.scope == Scope::Filename
    }
}

static DELIMITERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,]+").unwrap());

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// Splits on runs of whitespace or commas, keeping order and dropping empties.
pub fn tokenize(raw: &str) -> Vec<String> {
    DELIMITERS
        .split(raw)
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn has_search_terms(raw: &str) -> bool {
    !raw.trim_matches(is_delimiter).is_empty()
}
