use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::auth::Session;
use crate::dashboard::{
    ActionKind, ActionOutcome, ConfirmationRegistry, DashboardAction, DashboardActions,
};
use crate::proto::common::Empty;
use crate::proto::dashboard::dashboard_service_server::DashboardService;
use crate::proto::dashboard::{
    ConfirmActionRes, DashboardRes, PendingActionRes, RequestActionReq,
};

use super::items_service::{count_to_proto, item_to_proto, parse_item_id, LOAD_FAILED};

fn failure_message(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::DeleteItem => "Failed to delete item. Please try again.",
        ActionKind::MarkReturned => "Failed to update item. Please try again.",
        ActionKind::DeleteAccount => "Failed to delete account. Please try again.",
    }
}

fn parse_action(req: &RequestActionReq) -> Result<DashboardAction, Status> {
    let kind: ActionKind = req.action.parse()?;
    let action = match kind {
        ActionKind::DeleteAccount => DashboardAction::DeleteAccount,
        ActionKind::DeleteItem | ActionKind::MarkReturned => {
            if req.item_id.is_empty() {
                return Err(Status::invalid_argument("item_id is required"));
            }
            let id = parse_item_id(&req.item_id)?;
            if kind == ActionKind::DeleteItem {
                DashboardAction::DeleteItem(id)
            } else {
                DashboardAction::MarkReturned(id)
            }
        }
    };
    Ok(action)
}

fn pending_res(action: Option<DashboardAction>, prompt: String) -> PendingActionRes {
    match action {
        Some(action) => PendingActionRes {
            pending: true,
            action: action.kind().to_string(),
            item_id: action.item_id().map(|id| id.to_string()).unwrap_or_default(),
            prompt,
        },
        None => PendingActionRes::default(),
    }
}

pub struct DashboardServiceImpl {
    actions: DashboardActions,
    confirmations: Arc<ConfirmationRegistry>,
}

impl DashboardServiceImpl {
    pub fn new(actions: DashboardActions, confirmations: Arc<ConfirmationRegistry>) -> Self {
        Self {
            actions,
            confirmations,
        }
    }
}

#[tonic::async_trait]
impl DashboardService for DashboardServiceImpl {
    async fn list_my_items(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<DashboardRes>, Status> {
        let session = Session::require(&request)?;
        let owned = self
            .actions
            .list_owned(&session)
            .await
            .map_err(|e| e.into_status_with(LOAD_FAILED))?;

        Ok(Response::new(DashboardRes {
            email: session.email,
            lost: owned.lost.iter().map(item_to_proto).collect(),
            found: owned.found.iter().map(item_to_proto).collect(),
        }))
    }

    async fn request_action(
        &self,
        request: Request<RequestActionReq>,
    ) -> Result<Response<PendingActionRes>, Status> {
        let session = Session::require(&request)?;
        let action = parse_action(request.get_ref())?;

        let prompt = self
            .actions
            .prompt(&session, &action)
            .await
            .map_err(|e| e.into_status_with(LOAD_FAILED))?;
        self.confirmations.request(session.user_id, action)?;

        tracing::debug!(
            "Confirmation opened: user_id={}, action={}",
            session.user_id,
            action.kind()
        );
        Ok(Response::new(pending_res(Some(action), prompt)))
    }

    async fn get_pending_action(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<PendingActionRes>, Status> {
        let session = Session::require(&request)?;
        let Some(action) = self.confirmations.pending(session.user_id) else {
            return Ok(Response::new(PendingActionRes::default()));
        };

        // The target may have changed since the request was opened.
        match self.actions.prompt(&session, &action).await {
            Ok(prompt) => Ok(Response::new(pending_res(Some(action), prompt))),
            Err(e) if e.is_persistence() => Err(e.into_status_with(LOAD_FAILED)),
            Err(_) => {
                self.confirmations.cancel(session.user_id)?;
                Ok(Response::new(PendingActionRes::default()))
            }
        }
    }

    async fn confirm_action(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<ConfirmActionRes>, Status> {
        let session = Session::require(&request)?;
        let guard = self.confirmations.begin_commit(session.user_id)?;
        let action = guard.action();

        let result = self.actions.commit(&session, action).await;
        drop(guard);
        let outcome = result.map_err(|e| e.into_status_with(failure_message(action.kind())))?;

        let mut res = ConfirmActionRes {
            action: action.kind().to_string(),
            item_id: action.item_id().map(|id| id.to_string()).unwrap_or_default(),
            redirect_to: outcome.redirect_path().to_string(),
            ..Default::default()
        };
        match outcome {
            ActionOutcome::ItemDeleted(_) => {}
            ActionOutcome::ItemReturned(item) => {
                res.item = Some(item_to_proto(&item));
            }
            ActionOutcome::AccountDeleted {
                items_deleted,
                identity_deleted,
            } => {
                self.confirmations.clear(session.user_id);
                res.items_deleted = count_to_proto(items_deleted);
                res.identity_deleted = identity_deleted;
                res.signed_out = true;
            }
        }

        Ok(Response::new(res))
    }

    async fn cancel_action(&self, request: Request<Empty>) -> Result<Response<Empty>, Status> {
        let session = Session::require(&request)?;
        self.confirmations.cancel(session.user_id)?;
        Ok(Response::new(Empty {}))
    }
}
