use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Item, ItemFields, ItemRow, ItemStatus, NewItem};

use super::{ItemQuery, ItemStore};

const ITEM_COLUMNS: &str = "id, type AS item_type, title, description, category, campus, \
     location, date_occurred, contact_name, contact_email, contact_phone, image_url, \
     status, created_at";

pub struct PgItemStore {
    pool: PgPool,
}

impl PgItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn rows_to_items(rows: Vec<ItemRow>) -> AppResult<Vec<Item>> {
    rows.into_iter().map(Item::try_from).collect()
}

#[tonic::async_trait]
impl ItemStore for PgItemStore {
    async fn insert(&self, item: NewItem) -> AppResult<Item> {
        let f = &item.fields;
        let sql = format!(
            "INSERT INTO items (type, title, description, category, campus, location, \
             date_occurred, contact_name, contact_email, contact_phone, image_url, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {}",
            ITEM_COLUMNS
        );

        let row: ItemRow = sqlx::query_as(&sql)
            .bind(item.item_type.as_str())
            .bind(&f.title)
            .bind(&f.description)
            .bind(&f.category)
            .bind(&f.campus)
            .bind(&f.location)
            .bind(f.date_occurred)
            .bind(&f.contact_name)
            .bind(&f.contact_email)
            .bind(f.contact_phone.as_deref())
            .bind(f.image_url.as_deref())
            .bind(item.status.as_str())
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS);
        let row: Option<ItemRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Item::try_from).transpose()
    }

    async fn list(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        // Build dynamic WHERE clause
        let mut conditions = Vec::new();
        let mut param_idx = 1u32;

        let status_filter: Option<Vec<String>> = query.statuses.as_ref().map(|statuses| {
            conditions.push(format!("status = ANY(${})", param_idx));
            param_idx += 1;
            statuses.iter().map(|s| s.as_str().to_string()).collect()
        });

        let type_filter = query.item_type.map(|t| {
            conditions.push(format!("type = ${}", param_idx));
            param_idx += 1;
            t.as_str()
        });

        let owner_filter = query.owner_email.as_ref().map(|email| {
            conditions.push(format!("lower(contact_email) = lower(${})", param_idx));
            param_idx += 1;
            email.clone()
        });

        let limit_clause = match query.limit {
            Some(_) => format!(" LIMIT ${}", param_idx),
            None => String::new(),
        };

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {} FROM items {} ORDER BY created_at DESC{}",
            ITEM_COLUMNS, where_clause, limit_clause
        );

        let mut q = sqlx::query_as::<_, ItemRow>(&sql);
        if let Some(v) = status_filter {
            q = q.bind(v);
        }
        if let Some(v) = type_filter {
            q = q.bind(v);
        }
        if let Some(v) = owner_filter {
            q = q.bind(v);
        }
        if let Some(v) = query.limit {
            q = q.bind(v);
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows_to_items(rows)
    }

    async fn update_fields(&self, id: Uuid, fields: &ItemFields) -> AppResult<Option<Item>> {
        let sql = format!(
            "UPDATE items SET title = $1, description = $2, category = $3, campus = $4, \
             location = $5, date_occurred = $6, contact_name = $7, contact_email = $8, \
             contact_phone = $9, image_url = $10 \
             WHERE id = $11 \
             RETURNING {}",
            ITEM_COLUMNS
        );

        let row: Option<ItemRow> = sqlx::query_as(&sql)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(&fields.category)
            .bind(&fields.campus)
            .bind(&fields.location)
            .bind(fields.date_occurred)
            .bind(&fields.contact_name)
            .bind(&fields.contact_email)
            .bind(fields.contact_phone.as_deref())
            .bind(fields.image_url.as_deref())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Item::try_from).transpose()
    }

    async fn set_status(&self, id: Uuid, status: ItemStatus) -> AppResult<Option<Item>> {
        let sql = format!(
            "UPDATE items SET status = $1 WHERE id = $2 RETURNING {}",
            ITEM_COLUMNS
        );
        let row: Option<ItemRow> = sqlx::query_as(&sql)
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Item::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn delete_by_owner(&self, email: &str) -> AppResult<Vec<Item>> {
        let sql = format!(
            "DELETE FROM items WHERE lower(contact_email) = lower($1) RETURNING {}",
            ITEM_COLUMNS
        );
        let rows: Vec<ItemRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?;

        tracing::info!("Deleted {} items owned by {}", rows.len(), email);
        rows_to_items(rows)
    }
}
