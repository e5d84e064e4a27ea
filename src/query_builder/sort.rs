//! Client sort expression sanitization.
//!
//! Sort input arrives as free text (`"createdAt DESC"`, `"qualification.name ASC"`)
//! and is reduced to [`SortKey`] values whose identifiers have passed a strict
//! grammar. Anything that does not fit is dropped rather than reported, so a
//! malformed sort never fails the surrounding request.

use super::conditions::qualify_column;
use inflector::Inflector;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

/// Letters, underscores and dots only
static SORT_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}_.]+$").expect("sort identifier pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// `DESC` in any case selects descending; every other word is ascending
    pub fn parse(word: &str) -> Self {
        if word.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One sanitized ordering term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    alias: Option<String>,
    column: String,
    direction: SortDirection,
}

impl SortKey {
    pub fn new(alias: Option<&str>, column: &str, direction: SortDirection) -> Self {
        Self {
            alias: alias.map(str::to_string),
            column: column.to_string(),
            direction,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Render as an ORDER BY term, qualifying unaliased columns with `base_alias`
    pub fn to_sql(&self, base_alias: &str) -> String {
        let alias = self.alias.as_deref().unwrap_or(base_alias);
        format!(
            "{} {}",
            qualify_column(alias, &self.column),
            self.direction.to_sql()
        )
    }

    fn same_target(&self, other: &SortKey) -> bool {
        self.alias == other.alias && self.column == other.column
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{alias}.{} {}", self.column, self.direction.to_sql()),
            None => write!(f, "{} {}", self.column, self.direction.to_sql()),
        }
    }
}

/// Validates and canonicalizes raw sort expressions
#[derive(Debug, Clone)]
pub struct SortSanitizer {
    max_keys: usize,
    base_alias: Option<String>,
}

impl Default for SortSanitizer {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_MAX_SORT_KEYS)
    }
}

impl SortSanitizer {
    pub fn new(max_keys: usize) -> Self {
        Self {
            max_keys,
            base_alias: None,
        }
    }

    /// Treat `alias.column` for this alias the same as a bare `column`
    pub fn with_base_alias(mut self, alias: &str) -> Self {
        self.base_alias = Some(alias.to_string());
        self
    }

    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Parse one expression of the form `identifier direction`
    ///
    /// Returns `None` for anything outside the grammar: not exactly two
    /// space-separated parts, characters other than letters, underscores and
    /// dots, more than one dot, or an empty alias or column.
    pub fn sanitize_one(&self, expression: &str) -> Option<SortKey> {
        let parts: Vec<&str> = expression.trim().split(' ').collect();
        if parts.len() != 2 {
            return None;
        }

        let (identifier, direction) = (parts[0], parts[1]);
        if !SORT_IDENTIFIER.is_match(identifier) {
            return None;
        }

        let (alias, column) = match identifier.split_once('.') {
            Some((alias, column)) => {
                if alias.is_empty() || column.is_empty() || column.contains('.') {
                    return None;
                }
                (Some(normalize_identifier(alias)), normalize_identifier(column))
            }
            None => (None, normalize_identifier(identifier)),
        };

        if column.is_empty() || alias.as_deref() == Some("") {
            return None;
        }

        let alias = alias.filter(|a| Some(a.as_str()) != self.base_alias.as_deref());

        Some(SortKey {
            alias,
            column,
            direction: SortDirection::parse(direction),
        })
    }

    /// Sanitize a list of expressions
    ///
    /// Invalid entries are skipped, a later entry naming a column already
    /// present is dropped, and the result holds at most `max_keys` entries.
    pub fn sanitize<S: AsRef<str>>(&self, expressions: &[S]) -> Vec<SortKey> {
        self.sanitize_with(expressions, |_| true)
    }

    /// Like [`sanitize`](Self::sanitize), dropping keys rejected by `keep`
    /// before they count toward `max_keys`
    pub fn sanitize_with<S, F>(&self, expressions: &[S], keep: F) -> Vec<SortKey>
    where
        S: AsRef<str>,
        F: Fn(&SortKey) -> bool,
    {
        let mut keys: Vec<SortKey> = Vec::with_capacity(self.max_keys.min(expressions.len()));

        for expression in expressions {
            if keys.len() >= self.max_keys {
                break;
            }

            let expression = expression.as_ref();
            match self.sanitize_one(expression) {
                Some(key) if !keep(&key) => {
                    debug!(expression = %expression, "Dropping sort key rejected by caller");
                }
                Some(key) if keys.iter().any(|existing| existing.same_target(&key)) => {
                    debug!(expression = %expression, "Dropping duplicate sort key");
                }
                Some(key) => keys.push(key),
                None => {
                    debug!(expression = %expression, "Dropping invalid sort expression");
                }
            }
        }

        keys
    }
}

/// Lower camelCase and mixed case to snake_case, keeping existing underscores
fn normalize_identifier(identifier: &str) -> String {
    identifier
        .split('_')
        .map(|segment| segment.to_snake_case().to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}
