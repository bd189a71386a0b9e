//! Moves legacy inline photos (`data:` URIs stored in `items.image_url`)
//! into object storage and rewrites the rows to point at the uploaded
//! objects.
//!
//! Usage:
//!   DATABASE_URL=postgres://... GCS_BUCKET=... cargo run --bin migrate-inline-images
//!
//! Pass `--dry-run` to only report what would be migrated.

use anyhow::{bail, Context};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use campus_lost_found::config::Config;
use campus_lost_found::db::create_pool;
use campus_lost_found::reports::{discard_photo, store_photo, PhotoPolicy, PhotoUpload};
use campus_lost_found::storage::{backend_from_config, StorageBackend};

#[derive(Default)]
struct Summary {
    migrated: usize,
    skipped: usize,
    failed: usize,
}

async fn migrate_row(
    pool: &PgPool,
    storage: &dyn StorageBackend,
    policy: &PhotoPolicy,
    id: Uuid,
    data_uri: &str,
) -> anyhow::Result<bool> {
    let Some(upload) = PhotoUpload::from_data_uri(data_uri) else {
        tracing::warn!("Skipping item {}: image_url is not a base64 data URI", id);
        return Ok(false);
    };

    let url = store_photo(Some(storage), &upload, policy)
        .await
        .with_context(|| format!("upload failed for item {}", id))?;

    // Only rewrite rows nobody edited in the meantime.
    let result = sqlx::query("UPDATE items SET image_url = $1 WHERE id = $2 AND image_url = $3")
        .bind(&url)
        .bind(id)
        .bind(data_uri)
        .execute(pool)
        .await
        .with_context(|| format!("update failed for item {}", id))?;

    if result.rows_affected() == 0 {
        tracing::warn!("Item {} changed during migration, removing uploaded copy", id);
        discard_photo(Some(storage), Some(&url)).await;
        return Ok(false);
    }

    tracing::info!("Migrated item {}: {} bytes -> {}", id, upload.data.len(), url);
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "migrate_inline_images=info,campus_lost_found=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let dry_run = std::env::args().any(|a| a == "--dry-run");
    let config = Config::from_env().context("Failed to load configuration")?;

    let Some(database_url) = config.database_url.as_deref() else {
        bail!("DATABASE_URL must be set");
    };
    let pool = create_pool(database_url).await?;

    let Some(storage) = backend_from_config(&config).await else {
        bail!("no photo storage configured (set GCS_BUCKET or the R2_* variables)");
    };

    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT id, image_url FROM items WHERE image_url LIKE 'data:%' ORDER BY created_at",
    )
    .fetch_all(&pool)
    .await?;
    tracing::info!("Found {} items with inline images", rows.len());

    if dry_run {
        for (id, uri) in &rows {
            tracing::info!("Would migrate item {} ({} bytes inline)", id, uri.len());
        }
        return Ok(());
    }

    // Legacy rows were accepted without a size cap; only the type is checked.
    let policy = PhotoPolicy::new(usize::MAX);
    let mut summary = Summary::default();

    for (id, data_uri) in rows {
        match migrate_row(&pool, storage.as_ref(), &policy, id, &data_uri).await {
            Ok(true) => summary.migrated += 1,
            Ok(false) => summary.skipped += 1,
            Err(e) => {
                tracing::error!("{:#}", e);
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        "Done: migrated={}, skipped={}, failed={}",
        summary.migrated,
        summary.skipped,
        summary.failed
    );
    if summary.failed > 0 {
        bail!("{} items could not be migrated", summary.failed);
    }
    Ok(())
}
