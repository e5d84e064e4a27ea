use serde::{Deserialize, Serialize};

/// Default and ceiling page sizes for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl PageLimits {
    pub const fn new(default_limit: u32, max_limit: u32) -> Self {
        Self {
            default_limit,
            max_limit,
        }
    }

    /// Resolve a requested limit against these bounds
    ///
    /// An absent limit takes the default. A present limit is clamped into
    /// `0..=max_limit`, so negative requests select nothing.
    pub fn effective_limit(&self, requested: Option<i64>) -> u32 {
        match requested {
            None => self.default_limit.min(self.max_limit),
            Some(limit) => limit.clamp(0, i64::from(self.max_limit)) as u32,
        }
    }
}

/// Represents pagination parameters for SQL queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Pagination {
    /// Create pagination with only limit
    pub fn limit_only(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }

    /// Create pagination with both limit and offset
    pub fn limit_offset(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Build pagination from raw client arguments
    ///
    /// The limit is resolved through [`PageLimits::effective_limit`]; a negative
    /// offset is treated as zero and a zero offset is omitted.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>, limits: PageLimits) -> Self {
        let offset = offset
            .map(|o| o.clamp(0, i64::from(u32::MAX)) as u32)
            .filter(|o| *o > 0);

        Self {
            limit: Some(limits.effective_limit(limit)),
            offset,
        }
    }

    /// Convert to SQL string
    ///
    /// Values are integers produced by clamping, never client text, so they
    /// are rendered as literals.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: PageLimits = PageLimits::new(100, 100);

    #[test]
    fn test_absent_limit_uses_default() {
        let pagination = Pagination::clamped(None, None, PageLimits::new(20, 100));
        assert_eq!(pagination.limit, Some(20));
        assert_eq!(pagination.to_sql(), " LIMIT 20");
    }

    #[test]
    fn test_limit_is_clamped_to_max() {
        let pagination = Pagination::clamped(Some(5_000), Some(10), LIMITS);
        assert_eq!(pagination.to_sql(), " LIMIT 100 OFFSET 10");
    }

    #[test]
    fn test_negative_values_are_clamped() {
        let pagination = Pagination::clamped(Some(-3), Some(-40), LIMITS);
        assert_eq!(pagination.limit, Some(0));
        assert_eq!(pagination.offset, None);
    }

    #[test]
    fn test_limit_offset_sql() {
        assert_eq!(Pagination::limit_offset(10, 20).to_sql(), " LIMIT 10 OFFSET 20");
        assert_eq!(Pagination::limit_only(3).to_sql(), " LIMIT 3");
    }
}
