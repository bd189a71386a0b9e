//! In-process stores used when no database is configured, and by tests.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{AppUser, Item, ItemFields, ItemStatus, NewItem};

use super::{IdentityStore, ItemQuery, ItemStore};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Items kept newest first, mirroring `ORDER BY created_at DESC`.
#[derive(Default)]
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[tonic::async_trait]
impl ItemStore for MemoryItemStore {
    async fn insert(&self, item: NewItem) -> AppResult<Item> {
        let NewItem {
            item_type,
            status,
            fields,
        } = item;

        let mut stored = Item {
            id: Uuid::new_v4(),
            item_type,
            title: String::new(),
            description: String::new(),
            category: String::new(),
            campus: None,
            location: String::new(),
            date_occurred: fields.date_occurred,
            contact_name: String::new(),
            contact_email: String::new(),
            contact_phone: None,
            image_url: None,
            status,
            created_at: Utc::now(),
        };
        stored.apply_fields(&fields);

        write(&self.items).insert(0, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Item>> {
        Ok(read(&self.items).iter().find(|i| i.id == id).cloned())
    }

    async fn list(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let items = read(&self.items);
        let matching = items.iter().filter(|i| query.matches(i)).cloned();
        Ok(match query.limit {
            Some(limit) => matching.take(limit.max(0) as usize).collect(),
            None => matching.collect(),
        })
    }

    async fn update_fields(&self, id: Uuid, fields: &ItemFields) -> AppResult<Option<Item>> {
        let mut items = write(&self.items);
        Ok(items.iter_mut().find(|i| i.id == id).map(|item| {
            item.apply_fields(fields);
            item.clone()
        }))
    }

    async fn set_status(&self, id: Uuid, status: ItemStatus) -> AppResult<Option<Item>> {
        let mut items = write(&self.items);
        Ok(items.iter_mut().find(|i| i.id == id).map(|item| {
            item.status = status;
            item.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut items = write(&self.items);
        let before = items.len();
        items.retain(|i| i.id != id);
        Ok(items.len() != before)
    }

    async fn delete_by_owner(&self, email: &str) -> AppResult<Vec<Item>> {
        let mut items = write(&self.items);
        let (removed, kept): (Vec<Item>, Vec<Item>) =
            items.drain(..).partition(|i| i.is_owned_by(email));
        *items = kept;
        Ok(removed)
    }
}

#[derive(Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<String, AppUser>>,
    revoked: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[tonic::async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> AppResult<AppUser> {
        let mut users = write(&self.users);
        if users.contains_key(email) {
            return Err(AppError::AlreadyExists(
                "An account with this email already exists".into(),
            ));
        }
        let user = AppUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.insert(email.to_string(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<AppUser>> {
        Ok(read(&self.users).get(email).cloned())
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut users = write(&self.users);
        let before = users.len();
        users.retain(|_, u| u.id != id);
        Ok(users.len() != before)
    }

    async fn user_exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(read(&self.users).values().any(|u| u.id == id))
    }

    async fn revoke_session(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<()> {
        let mut revoked = write(&self.revoked);
        let now = Utc::now();
        revoked.retain(|_, exp| *exp >= now);
        revoked.insert(session_id, expires_at);
        Ok(())
    }

    async fn is_session_revoked(&self, session_id: Uuid) -> AppResult<bool> {
        Ok(read(&self.revoked).contains_key(&session_id))
    }
}
