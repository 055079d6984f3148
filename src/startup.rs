use anyhow::{Context, Result};
use sqlx::PgPool;

/// Liveness checks before the server starts taking traffic. Config shape
/// is validated in `Config::from_env`; this covers the collaborators the
/// process cannot run without.
pub async fn validate_environment(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("database connectivity check failed")?;

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .context("failed to check migrations table")?;

    if applied == 0 {
        anyhow::bail!("no migrations applied");
    }

    Ok(())
}
