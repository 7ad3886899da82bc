/*
 * Responsibility
 * - PostgreSQL (JSONB) 上の ResourceBackend 実装
 * - 1 テーブル (resources) を route 列で分けて複数リソースで共有する
 * - sqlx::Error は Fault (code なし → 500) として上位へ
 */
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Map, Value};
use sqlx::{PgPool, types::Json};

use crate::error::ApiProblem;
use crate::repos::backend::{
    ResourceBackend, ensure_identifier, expect_object, expect_objects, identifier_of,
};
use crate::repos::error::{BackendError, BackendResult};

#[derive(Debug, Clone, sqlx::FromRow)]
struct ResourceRow {
    body: Json<Value>,
}

#[derive(Clone, Debug)]
pub struct PgBackend {
    pool: PgPool,
    route: String,
    identifier_name: String,
}

impl PgBackend {
    pub fn new(pool: PgPool, route: impl Into<String>, identifier_name: impl Into<String>) -> Self {
        Self {
            pool,
            route: route.into(),
            identifier_name: identifier_name.into(),
        }
    }

    pub async fn ensure_schema(&self) -> BackendResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resources (
                route TEXT NOT NULL,
                id TEXT NOT NULL,
                body JSONB NOT NULL,
                PRIMARY KEY (route, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn missing(id: &str) -> BackendError {
        ApiProblem::not_found(format!("Entity '{id}' not found.")).into()
    }

    fn without_identifier(&self, mut obj: Map<String, Value>) -> Map<String, Value> {
        obj.remove(&self.identifier_name);
        obj
    }
}

#[async_trait]
impl ResourceBackend for PgBackend {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, data: Value) -> BackendResult<Value> {
        let mut obj = expect_object(data)?;
        let id = ensure_identifier(&mut obj, &self.identifier_name);

        let row = sqlx::query_as::<_, ResourceRow>(
            r#"
            INSERT INTO resources (route, id, body)
            VALUES ($1, $2, $3)
            ON CONFLICT (route, id) DO NOTHING
            RETURNING body
            "#,
        )
        .bind(&self.route)
        .bind(&id)
        .bind(Json(Value::Object(obj)))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.body.0),
            None => Err(ApiProblem::new(
                StatusCode::CONFLICT,
                format!("Entity '{id}' already exists."),
            )
            .into()),
        }
    }

    async fn fetch(&self, id: &str) -> BackendResult<Option<Value>> {
        let row = sqlx::query_as::<_, ResourceRow>(
            r#"
            SELECT body
            FROM resources
            WHERE route = $1 AND id = $2
            "#,
        )
        .bind(&self.route)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.body.0))
    }

    async fn fetch_all(&self) -> BackendResult<Vec<Value>> {
        let rows = sqlx::query_as::<_, ResourceRow>(
            r#"
            SELECT body
            FROM resources
            WHERE route = $1
            ORDER BY id
            "#,
        )
        .bind(&self.route)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.body.0).collect())
    }

    async fn update(&self, id: &str, data: Value) -> BackendResult<Value> {
        let mut obj = expect_object(data)?;
        obj.insert(self.identifier_name.clone(), Value::String(id.to_string()));

        let row = sqlx::query_as::<_, ResourceRow>(
            r#"
            UPDATE resources
            SET body = $3
            WHERE route = $1 AND id = $2
            RETURNING body
            "#,
        )
        .bind(&self.route)
        .bind(id)
        .bind(Json(Value::Object(obj)))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Self::missing(id))?;

        Ok(row.body.0)
    }

    async fn patch(&self, id: &str, data: Value) -> BackendResult<Value> {
        let changes = self.without_identifier(expect_object(data)?);

        // JSONB `||` merges top-level keys, same as the memory backend.
        let row = sqlx::query_as::<_, ResourceRow>(
            r#"
            UPDATE resources
            SET body = body || $3
            WHERE route = $1 AND id = $2
            RETURNING body
            "#,
        )
        .bind(&self.route)
        .bind(id)
        .bind(Json(Value::Object(changes)))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Self::missing(id))?;

        Ok(row.body.0)
    }

    async fn delete(&self, id: &str) -> BackendResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM resources
            WHERE route = $1 AND id = $2
            "#,
        )
        .bind(&self.route)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_list(&self) -> BackendResult<bool> {
        sqlx::query(
            r#"
            DELETE FROM resources
            WHERE route = $1
            "#,
        )
        .bind(&self.route)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    async fn patch_list(&self, data: Value) -> BackendResult<Vec<Value>> {
        let entries = expect_objects(data)?;

        let mut tx = self.pool.begin().await?;
        let mut patched = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = identifier_of(&Value::Object(entry.clone()), &self.identifier_name)
                .ok_or_else(|| {
                    BackendError::invalid_payload("Invalid payload: every entry needs an identifier")
                })?;
            let changes = self.without_identifier(entry);

            // Dropping `tx` on an early return rolls the batch back.
            let row = sqlx::query_as::<_, ResourceRow>(
                r#"
                UPDATE resources
                SET body = body || $3
                WHERE route = $1 AND id = $2
                RETURNING body
                "#,
            )
            .bind(&self.route)
            .bind(&id)
            .bind(Json(Value::Object(changes)))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Self::missing(&id))?;

            patched.push(row.body.0);
        }
        tx.commit().await?;

        Ok(patched)
    }

    async fn replace_list(&self, data: Value) -> BackendResult<Vec<Value>> {
        let entries = expect_objects(data)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            DELETE FROM resources
            WHERE route = $1
            "#,
        )
        .bind(&self.route)
        .execute(&mut *tx)
        .await?;

        let mut out = Vec::with_capacity(entries.len());
        for mut entry in entries {
            let id = ensure_identifier(&mut entry, &self.identifier_name);
            let row = sqlx::query_as::<_, ResourceRow>(
                r#"
                INSERT INTO resources (route, id, body)
                VALUES ($1, $2, $3)
                ON CONFLICT (route, id) DO UPDATE SET body = EXCLUDED.body
                RETURNING body
                "#,
            )
            .bind(&self.route)
            .bind(&id)
            .bind(Json(Value::Object(entry)))
            .fetch_one(&mut *tx)
            .await?;

            out.push(row.body.0);
        }
        tx.commit().await?;

        Ok(out)
    }
}
