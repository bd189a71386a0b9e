//! Owner dashboard: listing the user's items and the confirm-gated
//! delete / mark-returned / delete-account actions.

pub mod actions;
pub mod confirmation;

pub use actions::{ActionOutcome, DashboardActions, OwnedItems};
pub use confirmation::{
    ActionKind, CommitGuard, Confirmation, ConfirmationRegistry, DashboardAction,
};
