use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// An owner action that must be confirmed before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    DeleteItem(Uuid),
    MarkReturned(Uuid),
    DeleteAccount,
}

/// Action kind without its target, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    DeleteItem,
    MarkReturned,
    DeleteAccount,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::DeleteItem => "delete_item",
            ActionKind::MarkReturned => "mark_returned",
            ActionKind::DeleteAccount => "delete_account",
        }
    }
}

impl FromStr for ActionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delete_item" => Ok(ActionKind::DeleteItem),
            "mark_returned" => Ok(ActionKind::MarkReturned),
            "delete_account" => Ok(ActionKind::DeleteAccount),
            other => Err(AppError::InvalidInput(format!(
                "action must be 'delete_item', 'mark_returned' or 'delete_account', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DashboardAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            DashboardAction::DeleteItem(_) => ActionKind::DeleteItem,
            DashboardAction::MarkReturned(_) => ActionKind::MarkReturned,
            DashboardAction::DeleteAccount => ActionKind::DeleteAccount,
        }
    }

    pub fn item_id(&self) -> Option<Uuid> {
        match self {
            DashboardAction::DeleteItem(id) | DashboardAction::MarkReturned(id) => Some(*id),
            DashboardAction::DeleteAccount => None,
        }
    }
}

/// Two-step gate: `Idle -> Pending(target) -> Committing(target) -> Idle`.
///
/// Requesting while something is pending replaces the pending target.
/// Nothing can be requested, cancelled or committed while a commit is in
/// flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation<T> {
    Idle,
    Pending(T),
    Committing(T),
}

impl<T> Default for Confirmation<T> {
    fn default() -> Self {
        Confirmation::Idle
    }
}

impl<T: Clone> Confirmation<T> {
    pub fn request(&mut self, target: T) -> AppResult<()> {
        if let Confirmation::Committing(_) = self {
            return Err(AppError::FailedPrecondition(
                "another action is still being applied".into(),
            ));
        }
        *self = Confirmation::Pending(target);
        Ok(())
    }

    /// Drops the pending target, if any.
    pub fn cancel(&mut self) -> AppResult<Option<T>> {
        match std::mem::take(self) {
            Confirmation::Pending(target) => Ok(Some(target)),
            Confirmation::Idle => Ok(None),
            committing @ Confirmation::Committing(_) => {
                *self = committing;
                Err(AppError::FailedPrecondition(
                    "the action is already being applied".into(),
                ))
            }
        }
    }

    /// Moves the pending target into `Committing` and hands it out.
    pub fn begin_commit(&mut self) -> AppResult<T> {
        match self {
            Confirmation::Pending(target) => {
                let target = target.clone();
                *self = Confirmation::Committing(target.clone());
                Ok(target)
            }
            Confirmation::Idle => Err(AppError::FailedPrecondition(
                "no action is awaiting confirmation".into(),
            )),
            Confirmation::Committing(_) => Err(AppError::FailedPrecondition(
                "the action is already being applied".into(),
            )),
        }
    }

    /// Returns to `Idle` once the commit finished, successfully or not.
    pub fn finish(&mut self) {
        if let Confirmation::Committing(_) = self {
            *self = Confirmation::Idle;
        }
    }

    pub fn pending(&self) -> Option<&T> {
        match self {
            Confirmation::Pending(target) => Some(target),
            _ => None,
        }
    }
}

/// Per-user confirmation gates.
#[derive(Default)]
pub struct ConfirmationRegistry {
    gates: Mutex<HashMap<Uuid, Confirmation<DashboardAction>>>,
}

impl ConfirmationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_gate<R>(
        &self,
        user_id: Uuid,
        f: impl FnOnce(&mut Confirmation<DashboardAction>) -> R,
    ) -> R {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        let gate = gates.entry(user_id).or_default();
        let result = f(gate);
        if *gate == Confirmation::Idle {
            gates.remove(&user_id);
        }
        result
    }

    pub fn request(&self, user_id: Uuid, action: DashboardAction) -> AppResult<()> {
        self.with_gate(user_id, |gate| gate.request(action))
    }

    pub fn pending(&self, user_id: Uuid) -> Option<DashboardAction> {
        self.with_gate(user_id, |gate| gate.pending().copied())
    }

    pub fn cancel(&self, user_id: Uuid) -> AppResult<Option<DashboardAction>> {
        self.with_gate(user_id, |gate| gate.cancel())
    }

    /// The gate stays in `Committing` until the returned guard is dropped,
    /// including when the committing future itself is dropped.
    pub fn begin_commit(&self, user_id: Uuid) -> AppResult<CommitGuard<'_>> {
        let action = self.with_gate(user_id, |gate| gate.begin_commit())?;
        Ok(CommitGuard {
            registry: self,
            user_id,
            action,
        })
    }

    fn finish(&self, user_id: Uuid) {
        self.with_gate(user_id, |gate| gate.finish())
    }

    /// Forgets everything for the user, e.g. on sign-out.
    pub fn clear(&self, user_id: Uuid) {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.remove(&user_id);
    }
}

#[must_use = "the commit ends as soon as the guard is dropped"]
pub struct CommitGuard<'a> {
    registry: &'a ConfirmationRegistry,
    user_id: Uuid,
    action: DashboardAction,
}

impl CommitGuard<'_> {
    pub fn action(&self) -> DashboardAction {
        self.action
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.registry.finish(self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_confirm_finish() {
        let mut gate = Confirmation::default();
        gate.request("item-1").unwrap();
        assert_eq!(gate.pending(), Some(&"item-1"));

        assert_eq!(gate.begin_commit().unwrap(), "item-1");
        assert_eq!(gate, Confirmation::Committing("item-1"));
        assert_eq!(gate.pending(), None);

        gate.finish();
        assert_eq!(gate, Confirmation::Idle);
    }

    #[test]
    fn test_confirm_without_request_fails() {
        let mut gate: Confirmation<&str> = Confirmation::Idle;
        assert!(gate.begin_commit().is_err());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut gate = Confirmation::default();
        gate.request(1).unwrap();
        assert_eq!(gate.cancel().unwrap(), Some(1));
        assert_eq!(gate, Confirmation::Idle);
        assert_eq!(gate.cancel().unwrap(), None);
    }

    #[test]
    fn test_rerequest_replaces_target() {
        let mut gate = Confirmation::default();
        gate.request(1).unwrap();
        gate.request(2).unwrap();
        assert_eq!(gate.begin_commit().unwrap(), 2);
    }

    #[test]
    fn test_double_commit_is_rejected() {
        let mut gate = Confirmation::default();
        gate.request(1).unwrap();
        gate.begin_commit().unwrap();
        assert!(gate.begin_commit().is_err());
        assert!(gate.request(2).is_err());
        assert!(gate.cancel().is_err());
        assert_eq!(gate, Confirmation::Committing(1));
    }

    #[test]
    fn test_registry_is_per_user() {
        let registry = ConfirmationRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let item = Uuid::new_v4();

        registry.request(alice, DashboardAction::DeleteItem(item)).unwrap();
        assert_eq!(registry.pending(alice), Some(DashboardAction::DeleteItem(item)));
        assert_eq!(registry.pending(bob), None);
        assert!(registry.begin_commit(bob).is_err());

        registry.clear(alice);
        assert_eq!(registry.pending(alice), None);
    }

    #[test]
    fn test_commit_guard_releases_gate() {
        let registry = ConfirmationRegistry::new();
        let user = Uuid::new_v4();
        let item = Uuid::new_v4();
        registry.request(user, DashboardAction::MarkReturned(item)).unwrap();

        let guard = registry.begin_commit(user).unwrap();
        assert_eq!(guard.action(), DashboardAction::MarkReturned(item));
        assert!(registry.request(user, DashboardAction::DeleteAccount).is_err());
        assert!(registry.cancel(user).is_err());

        drop(guard);
        assert_eq!(registry.cancel(user).unwrap(), None);
        registry.request(user, DashboardAction::DeleteAccount).unwrap();
        assert_eq!(registry.pending(user), Some(DashboardAction::DeleteAccount));
    }

    #[test]
    fn test_action_kind_parsing() {
        assert_eq!("mark_returned".parse::<ActionKind>().unwrap(), ActionKind::MarkReturned);
        assert!("archive".parse::<ActionKind>().is_err());
        assert_eq!(DashboardAction::DeleteAccount.item_id(), None);
    }
}
