use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Session;
use crate::db::{IdentityStore, ItemQuery, ItemStore};
use crate::error::{AppError, AppResult};
use crate::models::{Item, ItemStatus, ItemType};
use crate::reports::discard_photo;
use crate::storage::StorageBackend;

use super::confirmation::DashboardAction;

const DELETE_ITEM_PROMPT: &str =
    "This action cannot be undone. This will permanently delete this item from the database.";
const MARK_RETURNED_PROMPT: &str = "This will mark the item as returned and remove it from public listings. You can still view it in your dashboard.";
const DELETE_ACCOUNT_PROMPT: &str = "This action cannot be undone. This will permanently delete your account and all your posted items from the database.";

/// The signed-in user's items, split by type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OwnedItems {
    pub lost: Vec<Item>,
    pub found: Vec<Item>,
}

/// Result of a committed dashboard action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    ItemDeleted(Uuid),
    ItemReturned(Item),
    AccountDeleted {
        items_deleted: usize,
        identity_deleted: bool,
    },
}

impl ActionOutcome {
    /// Where the client goes next. Deleting the account signs out and
    /// lands on the home page; everything else stays on the dashboard.
    pub fn redirect_path(&self) -> &'static str {
        match self {
            ActionOutcome::AccountDeleted { .. } => "/",
            _ => "/dashboard",
        }
    }
}

/// Owner-side mutations behind the dashboard.
pub struct DashboardActions {
    items: Arc<dyn ItemStore>,
    identities: Arc<dyn IdentityStore>,
    storage: Option<Arc<dyn StorageBackend>>,
}

impl DashboardActions {
    pub fn new(
        items: Arc<dyn ItemStore>,
        identities: Arc<dyn IdentityStore>,
        storage: Option<Arc<dyn StorageBackend>>,
    ) -> Self {
        Self {
            items,
            identities,
            storage,
        }
    }

    pub async fn list_owned(&self, session: &Session) -> AppResult<OwnedItems> {
        let items = self.items.list(&ItemQuery::owned_by(&session.email)).await?;
        let (lost, found): (Vec<Item>, Vec<Item>) = items
            .into_iter()
            .partition(|item| item.item_type == ItemType::Lost);
        Ok(OwnedItems { lost, found })
    }

    async fn owned_item(&self, session: &Session, id: Uuid) -> AppResult<Item> {
        let item = self
            .items
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".into()))?;
        if !item.is_owned_by(&session.email) {
            return Err(AppError::PermissionDenied(
                "You can only manage your own items".into(),
            ));
        }
        Ok(item)
    }

    /// Checks that `action` may be requested and returns the confirmation
    /// prompt to show.
    pub async fn prompt(&self, session: &Session, action: &DashboardAction) -> AppResult<String> {
        match action {
            DashboardAction::DeleteItem(id) => {
                let item = self.owned_item(session, *id).await?;
                Ok(format!("Delete \"{}\"? {}", item.title, DELETE_ITEM_PROMPT))
            }
            DashboardAction::MarkReturned(id) => {
                let item = self.owned_item(session, *id).await?;
                if item.status == ItemStatus::Returned {
                    return Err(AppError::FailedPrecondition(
                        "Item is already marked as returned".into(),
                    ));
                }
                Ok(format!("Mark \"{}\" as returned? {}", item.title, MARK_RETURNED_PROMPT))
            }
            DashboardAction::DeleteAccount => {
                Ok(format!("Delete account {}? {}", session.email, DELETE_ACCOUNT_PROMPT))
            }
        }
    }

    /// Applies a confirmed action.
    pub async fn commit(&self, session: &Session, action: DashboardAction) -> AppResult<ActionOutcome> {
        match action {
            DashboardAction::DeleteItem(id) => self.delete_item(session, id).await,
            DashboardAction::MarkReturned(id) => self.mark_returned(session, id).await,
            DashboardAction::DeleteAccount => self.delete_account(session).await,
        }
    }

    async fn delete_item(&self, session: &Session, id: Uuid) -> AppResult<ActionOutcome> {
        let item = self.owned_item(session, id).await?;
        if !self.items.delete(id).await? {
            return Err(AppError::NotFound("Item not found".into()));
        }
        discard_photo(self.storage.as_deref(), item.image_url.as_deref()).await;

        tracing::info!("Item deleted: id={}, owner={}", id, session.email);
        Ok(ActionOutcome::ItemDeleted(id))
    }

    async fn mark_returned(&self, session: &Session, id: Uuid) -> AppResult<ActionOutcome> {
        self.owned_item(session, id).await?;
        let item = self
            .items
            .set_status(id, ItemStatus::Returned)
            .await?
            .ok_or_else(|| AppError::NotFound("Item not found".into()))?;

        tracing::info!("Item marked returned: id={}, owner={}", id, session.email);
        Ok(ActionOutcome::ItemReturned(item))
    }

    /// Items first, then the identity, then the session. The session ends
    /// even when the identity could not be deleted.
    async fn delete_account(&self, session: &Session) -> AppResult<ActionOutcome> {
        let removed = self.items.delete_by_owner(&session.email).await?;
        for item in &removed {
            discard_photo(self.storage.as_deref(), item.image_url.as_deref()).await;
        }

        let identity_deleted = match self.identities.delete_user(session.user_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!(
                    "Failed to delete identity: user_id={}, error={}",
                    session.user_id,
                    e
                );
                false
            }
        };

        if let Err(e) = self
            .identities
            .revoke_session(session.session_id, session.expires_at)
            .await
        {
            tracing::warn!(
                "Failed to revoke session: session_id={}, error={}",
                session.session_id,
                e
            );
        }

        tracing::info!(
            "Account deleted: user_id={}, items_deleted={}, identity_deleted={}",
            session.user_id,
            removed.len(),
            identity_deleted
        );
        Ok(ActionOutcome::AccountDeleted {
            items_deleted: removed.len(),
            identity_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    use crate::db::{MemoryIdentityStore, MemoryItemStore};
    use crate::models::{ItemFields, NewItem};
    use crate::storage::testing::RecordingBackend;

    struct Fixture {
        items: Arc<MemoryItemStore>,
        identities: Arc<MemoryIdentityStore>,
        storage: Arc<RecordingBackend>,
        actions: DashboardActions,
    }

    fn fixture() -> Fixture {
        let items = Arc::new(MemoryItemStore::new());
        let identities = Arc::new(MemoryIdentityStore::new());
        let storage = Arc::new(RecordingBackend::default());
        let actions = DashboardActions::new(
            items.clone(),
            identities.clone(),
            Some(storage.clone() as Arc<dyn StorageBackend>),
        );
        Fixture {
            items,
            identities,
            storage,
            actions,
        }
    }

    async fn sign_up(identities: &MemoryIdentityStore, email: &str) -> Session {
        let user = identities.create_user(email, "hash").await.unwrap();
        Session {
            user_id: user.id,
            email: user.email,
            session_id: Uuid::new_v4(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn fields(title: &str, email: &str, image_url: Option<String>) -> ItemFields {
        ItemFields {
            title: title.into(),
            description: "d".into(),
            category: "Keys".into(),
            campus: "Hunter College".into(),
            location: "Gym".into(),
            date_occurred: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            contact_name: "A".into(),
            contact_email: email.into(),
            contact_phone: None,
            image_url,
        }
    }

    async fn report(f: &Fixture, item_type: ItemType, title: &str, email: &str) -> Item {
        f.items
            .insert(NewItem {
                item_type,
                status: ItemStatus::Active,
                fields: fields(title, email, None),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_owned_splits_by_type_and_keeps_returned() {
        let f = fixture();
        let session = sign_up(&f.identities, "a@cuny.edu").await;
        let lost = report(&f, ItemType::Lost, "Keys", "a@cuny.edu").await;
        let found = report(&f, ItemType::Found, "Wallet", "A@CUNY.EDU").await;
        report(&f, ItemType::Lost, "Other", "b@cuny.edu").await;
        f.items.set_status(lost.id, ItemStatus::Returned).await.unwrap();

        let owned = f.actions.list_owned(&session).await.unwrap();
        assert_eq!(owned.lost.len(), 1);
        assert_eq!(owned.lost[0].status, ItemStatus::Returned);
        assert_eq!(owned.found.len(), 1);
        assert_eq!(owned.found[0].id, found.id);
    }

    #[tokio::test]
    async fn test_prompt_rejects_foreign_and_missing_items() {
        let f = fixture();
        let session = sign_up(&f.identities, "a@cuny.edu").await;
        let foreign = report(&f, ItemType::Lost, "Keys", "b@cuny.edu").await;

        let err = f
            .actions
            .prompt(&session, &DashboardAction::DeleteItem(foreign.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));

        let err = f
            .actions
            .prompt(&session, &DashboardAction::DeleteItem(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_returned_twice_is_rejected_at_request() {
        let f = fixture();
        let session = sign_up(&f.identities, "a@cuny.edu").await;
        let item = report(&f, ItemType::Found, "Wallet", "a@cuny.edu").await;

        let prompt = f
            .actions
            .prompt(&session, &DashboardAction::MarkReturned(item.id))
            .await
            .unwrap();
        assert!(prompt.contains("Wallet"));

        let outcome = f
            .actions
            .commit(&session, DashboardAction::MarkReturned(item.id))
            .await
            .unwrap();
        match outcome {
            ActionOutcome::ItemReturned(item) => assert_eq!(item.status, ItemStatus::Returned),
            other => panic!("unexpected outcome {:?}", other),
        }

        let err = f
            .actions
            .prompt(&session, &DashboardAction::MarkReturned(item.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_delete_item_discards_photo() {
        let f = fixture();
        let session = sign_up(&f.identities, "a@cuny.edu").await;
        let url = f
            .storage
            .upload("items/abc.png", b"png", "image/png")
            .await
            .unwrap();
        let item = f
            .items
            .insert(NewItem {
                item_type: ItemType::Lost,
                status: ItemStatus::Active,
                fields: fields("Keys", "a@cuny.edu", Some(url)),
            })
            .await
            .unwrap();

        let outcome = f
            .actions
            .commit(&session, DashboardAction::DeleteItem(item.id))
            .await
            .unwrap();
        assert_eq!(outcome, ActionOutcome::ItemDeleted(item.id));
        assert_eq!(outcome.redirect_path(), "/dashboard");
        assert!(f.items.get(item.id).await.unwrap().is_none());
        assert!(f.storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_delete_account_cascades_and_revokes() {
        let f = fixture();
        let session = sign_up(&f.identities, "a@cuny.edu").await;
        report(&f, ItemType::Lost, "Keys", "a@cuny.edu").await;
        report(&f, ItemType::Found, "Wallet", "a@cuny.edu").await;
        let other = report(&f, ItemType::Lost, "Phone", "b@cuny.edu").await;

        let outcome = f
            .actions
            .commit(&session, DashboardAction::DeleteAccount)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::AccountDeleted {
                items_deleted: 2,
                identity_deleted: true
            }
        );
        assert_eq!(outcome.redirect_path(), "/");
        assert!(f.identities.find_by_email("a@cuny.edu").await.unwrap().is_none());
        assert!(f.identities.is_session_revoked(session.session_id).await.unwrap());
        assert!(f.items.get(other.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_account_still_signs_out_without_identity() {
        let f = fixture();
        let session = sign_up(&f.identities, "a@cuny.edu").await;
        f.identities.delete_user(session.user_id).await.unwrap();

        let outcome = f
            .actions
            .commit(&session, DashboardAction::DeleteAccount)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::AccountDeleted {
                items_deleted: 0,
                identity_deleted: false
            }
        );
        assert!(f.identities.is_session_revoked(session.session_id).await.unwrap());
    }
}
