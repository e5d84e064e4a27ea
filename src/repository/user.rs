use super::{fetch_list, list_query, FetchConfig, ListResult};
use crate::error::Result;
use crate::filter::EntitySchema;
use crate::models::{User, UserFilter};
use crate::query_builder::{qualify_column, PageLimits, SelectQuery, SortSanitizer};
use sqlx::PgPool;

/// Columns a user row is read from; credentials stay in the table
const COLUMNS: [&str; 6] = ["id", "display_name", "email", "role", "activated", "created_at"];

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
    sanitizer: SortSanitizer,
    limits: PageLimits,
}

impl UserRepository {
    pub fn new(pool: PgPool, sanitizer: SortSanitizer, limits: PageLimits) -> Self {
        Self {
            pool,
            sanitizer,
            limits,
        }
    }

    pub async fn fetch(&self, config: &FetchConfig<UserFilter>) -> Result<ListResult<User>> {
        let query = list_query::<User, _>(&self.sanitizer, self.limits, config);
        let query = Self::public_columns(query);
        fetch_list(&self.pool, &query, config.count).await
    }

    fn public_columns(query: SelectQuery) -> SelectQuery {
        query.select(
            COLUMNS
                .iter()
                .map(|column| qualify_column(User::ALIAS, column))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_never_selected() {
        let filter = UserFilter {
            activated: Some(false),
            ..Default::default()
        };
        let config = FetchConfig::filtered(filter);

        let sql = UserRepository::public_columns(list_query::<User, _>(
            &SortSanitizer::default(),
            PageLimits::new(100, 100),
            &config,
        ))
        .to_sql();

        assert!(sql.starts_with(
            "SELECT \"user\".\"id\", \"user\".\"display_name\", \"user\".\"email\", \
             \"user\".\"role\", \"user\".\"activated\", \"user\".\"created_at\" \
             FROM \"users\" AS \"user\" WHERE \"user\".\"activated\" = $1"
        ));
        assert!(!sql.contains("password"));
    }
}
