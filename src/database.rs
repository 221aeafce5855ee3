use std::time::Duration;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<MySqlPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &MySqlPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Converts MySQL's unsigned `LAST_INSERT_ID()` into the signed ids used by the schema.
pub fn inserted_id(result: &sqlx::mysql::MySqlQueryResult) -> i64 {
    i64::try_from(result.last_insert_id()).unwrap_or(i64::MAX)
}

// Schema-level behaviour. These need a MySQL server reachable through
// DATABASE_URL: `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::inserted_id;
    use crate::handlers::inventory::write_inventory;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use sqlx::MySqlPool;

    async fn insert_product(pool: &MySqlPool, name: &str) -> i64 {
        let result = sqlx::query("INSERT INTO product_types (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
        inserted_id(&result)
    }

    async fn insert_material(pool: &MySqlPool, name: &str) -> i64 {
        let result = sqlx::query("INSERT INTO materials (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
        inserted_id(&result)
    }

    #[ignore = "requires MySQL at DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn composition_with_unknown_product_is_rejected(pool: MySqlPool) {
        let material_id = insert_material(&pool, "Brazil Santos").await;

        let err = sqlx::query(
            "INSERT INTO product_compositions (product_id, material_id, ratio) VALUES (?, ?, ?)",
        )
        .bind(9_999_i64)
        .bind(material_id)
        .bind(dec!(0.55))
        .execute(&pool)
        .await
        .unwrap_err();

        assert!(err.as_database_error().unwrap().is_foreign_key_violation());
    }

    #[ignore = "requires MySQL at DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn composition_with_unknown_material_is_rejected(pool: MySqlPool) {
        let product_id = insert_product(&pool, "House Blend").await;

        let err = sqlx::query(
            "INSERT INTO product_compositions (product_id, material_id, ratio) VALUES (?, ?, ?)",
        )
        .bind(product_id)
        .bind(9_999_i64)
        .bind(dec!(0.55))
        .execute(&pool)
        .await
        .unwrap_err();

        assert!(err.as_database_error().unwrap().is_foreign_key_violation());
    }

    #[ignore = "requires MySQL at DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn purchase_with_unknown_material_is_rejected(pool: MySqlPool) {
        let err = sqlx::query(
            "INSERT INTO material_purchases
                 (material_id, material_name, quantity, price, total, purchase_date)
             VALUES (?, 'ghost', 1, 1, 1, '2025-01-01')",
        )
        .bind(9_999_i64)
        .execute(&pool)
        .await
        .unwrap_err();

        assert!(err.as_database_error().unwrap().is_foreign_key_violation());
    }

    #[ignore = "requires MySQL at DATABASE_URL"]
    #[sqlx::test(migrations = "./migrations")]
    async fn inventory_update_refreshes_updated_at_only(pool: MySqlPool) {
        let result = sqlx::query("INSERT INTO inventory (name, quantity) VALUES ('Colombia', 10)")
            .execute(&pool)
            .await
            .unwrap();
        let id = inserted_id(&result);

        let (created_before, updated_before): (DateTime<Utc>, DateTime<Utc>) =
            sqlx::query_as("SELECT created_at, updated_at FROM inventory WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Same quantity: the row must still count as updated.
        let found = write_inventory(&pool, id, Some(dec!(10)), None).await.unwrap();
        assert!(found);

        let (created_after, updated_after): (DateTime<Utc>, DateTime<Utc>) =
            sqlx::query_as("SELECT created_at, updated_at FROM inventory WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();

        assert_eq!(created_before, created_after);
        assert!(updated_after > updated_before);
    }
}
