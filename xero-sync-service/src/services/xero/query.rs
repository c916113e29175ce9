//! Helpers for Xero `where` filter expressions.

/// Normalize free text for use inside a quoted filter value.
///
/// Quote characters are dropped and whitespace runs collapse to a single
/// space, so the result is stable under repeated escaping.
pub fn escape_param(value: &str) -> String {
    value
        .replace('"', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds `Field=="value"` clauses joined with `&&`.
#[derive(Debug, Default, Clone)]
pub struct WhereClause {
    clauses: Vec<String>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: &str) -> Self {
        self.clauses
            .push(format!("{}==\"{}\"", field, escape_param(value)));
        self
    }

    pub fn eq_opt(self, field: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    pub fn build(&self) -> String {
        self.clauses.join("&&")
    }
}
