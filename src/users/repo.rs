use sqlx::PgPool;

use crate::auth::repo::User;

/// All users for the admin table, most recent login first.
pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, blocked, last_login, created_at
        FROM users
        ORDER BY last_login DESC NULLS LAST
        "#,
    )
    .fetch_all(db)
    .await
}

/// Single-statement bulk update; ids with no matching row are ignored.
pub async fn set_blocked(db: &PgPool, ids: &[i64], blocked: bool) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE users SET blocked = $2 WHERE id = ANY($1)")
        .bind(ids)
        .bind(blocked)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_many(db: &PgPool, ids: &[i64]) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
        .bind(ids)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
