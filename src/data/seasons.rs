//! Queries against the `seasons` table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;

/// Id of the newest active season, or `None` when no season is active.
pub async fn active_season_id(pool: &PgPool) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT id::text
        FROM seasons
        WHERE is_active = true
        ORDER BY start_date DESC NULLS LAST
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
    .context("failed to fetch active season")
}

/// Start date of the earliest season whose name begins with `name_prefix`
/// (case-insensitive). `None` when nothing matches or the match has no start date.
pub async fn first_start_date_matching(pool: &PgPool, name_prefix: &str) -> Result<Option<NaiveDate>> {
    let start_date = sqlx::query_scalar::<_, Option<NaiveDate>>(
        r#"
        SELECT start_date
        FROM seasons
        WHERE name ILIKE $1
        ORDER BY start_date ASC
        LIMIT 1
        "#,
    )
    .bind(like_prefix(name_prefix))
    .fetch_optional(pool)
    .await
    .context("failed to fetch rating start season")?;

    Ok(start_date.flatten())
}

/// Build an `ILIKE` pattern matching strings that start with `prefix` literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_prefix_appends_wildcard() {
        assert_eq!(like_prefix("spring 2026"), "spring 2026%");
    }

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("100%_club\\"), "100\\%\\_club\\\\%");
    }

    #[test]
    fn like_prefix_trims_whitespace() {
        assert_eq!(like_prefix("  Spring 2026 "), "Spring 2026%");
    }
}
