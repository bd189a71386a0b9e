pub mod identities;
pub mod items;
pub mod memory;
pub mod pool;

pub use identities::PgIdentityStore;
pub use items::PgItemStore;
pub use memory::{MemoryIdentityStore, MemoryItemStore};
pub use pool::{create_pool, run_migrations};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{AppUser, Item, ItemFields, ItemStatus, ItemType, NewItem};

/// Selection over the items table. Results are always newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    pub statuses: Option<Vec<ItemStatus>>,
    pub item_type: Option<ItemType>,
    pub owner_email: Option<String>,
    pub limit: Option<i64>,
}

impl ItemQuery {
    /// Everything visible on the public browse page.
    pub fn public() -> Self {
        Self {
            statuses: Some(ItemStatus::PUBLIC.to_vec()),
            ..Default::default()
        }
    }

    /// Newest public items of one type.
    pub fn recent(item_type: ItemType, limit: i64) -> Self {
        Self {
            statuses: Some(ItemStatus::PUBLIC.to_vec()),
            item_type: Some(item_type),
            limit: Some(limit),
            ..Default::default()
        }
    }

    /// Every item owned by `email`, whatever its status.
    pub fn owned_by(email: &str) -> Self {
        Self {
            owner_email: Some(email.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&item.status) {
                return false;
            }
        }
        if let Some(item_type) = self.item_type {
            if item.item_type != item_type {
                return false;
            }
        }
        if let Some(email) = &self.owner_email {
            if !item.is_owned_by(email) {
                return false;
            }
        }
        true
    }
}

/// Persistent store for item records.
#[tonic::async_trait]
pub trait ItemStore: Send + Sync {
    async fn insert(&self, item: NewItem) -> AppResult<Item>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Item>>;

    async fn list(&self, query: &ItemQuery) -> AppResult<Vec<Item>>;

    /// Full overwrite of the user-editable fields. `None` when no such item.
    async fn update_fields(&self, id: Uuid, fields: &ItemFields) -> AppResult<Option<Item>>;

    async fn set_status(&self, id: Uuid, status: ItemStatus) -> AppResult<Option<Item>>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Removes every item owned by `email` and returns what was removed.
    async fn delete_by_owner(&self, email: &str) -> AppResult<Vec<Item>>;
}

/// Accounts and session revocations.
#[tonic::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with `AlreadyExists` when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<AppUser>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<AppUser>>;

    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;

    async fn user_exists(&self, id: Uuid) -> AppResult<bool>;

    async fn revoke_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<()>;

    async fn is_session_revoked(&self, session_id: Uuid) -> AppResult<bool>;
}
