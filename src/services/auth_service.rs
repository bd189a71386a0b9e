use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::auth::{
    hash_password, normalize_email, verify_password, Session, SessionKeys, SignUpPolicy,
};
use crate::dashboard::ConfirmationRegistry;
use crate::db::IdentityStore;
use crate::proto::auth::auth_service_server::AuthService;
use crate::proto::auth::{
    AuthResponse, LoginRequest, SessionResponse, SignUpRequest, SignUpResponse,
};
use crate::proto::common::Empty;

const SIGN_UP_FAILED: &str = "Failed to create account. Please try again.";
const LOGIN_FAILED: &str = "Failed to sign in. Please try again.";
const SIGN_OUT_FAILED: &str = "Failed to sign out. Please try again.";
const BAD_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthServiceImpl {
    identities: Arc<dyn IdentityStore>,
    keys: Arc<SessionKeys>,
    policy: SignUpPolicy,
    confirmations: Arc<ConfirmationRegistry>,
}

impl AuthServiceImpl {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        keys: Arc<SessionKeys>,
        policy: SignUpPolicy,
        confirmations: Arc<ConfirmationRegistry>,
    ) -> Self {
        Self {
            identities,
            keys,
            policy,
            confirmations,
        }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn sign_up(
        &self,
        request: Request<SignUpRequest>,
    ) -> Result<Response<SignUpResponse>, Status> {
        let req = request.into_inner();
        let email = normalize_email(&req.email);

        // Domain and password rules are checked before the store is touched.
        self.policy.validate(&email, &req.password, &req.confirm_password)?;

        let password_hash =
            hash_password(&req.password).map_err(|e| e.into_status_with(SIGN_UP_FAILED))?;
        let user = self
            .identities
            .create_user(&email, &password_hash)
            .await
            .map_err(|e| e.into_status_with(SIGN_UP_FAILED))?;

        tracing::info!("Account created: user_id={}, email={}", user.id, user.email);

        Ok(Response::new(SignUpResponse {
            user_id: user.id.to_string(),
            email: user.email,
        }))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<AuthResponse>, Status> {
        let req = request.into_inner();
        let email = normalize_email(&req.email);

        let user = self
            .identities
            .find_by_email(&email)
            .await
            .map_err(|e| e.into_status_with(LOGIN_FAILED))?
            .ok_or_else(|| Status::unauthenticated(BAD_CREDENTIALS))?;

        let matches = verify_password(&req.password, &user.password_hash)
            .map_err(|e| e.into_status_with(LOGIN_FAILED))?;
        if !matches {
            tracing::debug!("Login rejected: email={}", email);
            return Err(Status::unauthenticated(BAD_CREDENTIALS));
        }

        let (token, session) = self
            .keys
            .issue(&user)
            .map_err(|e| e.into_status_with(LOGIN_FAILED))?;

        Ok(Response::new(AuthResponse {
            token,
            expires_at: session.expires_at.to_rfc3339(),
            user_id: user.id.to_string(),
            email: user.email,
        }))
    }

    async fn get_session(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<SessionResponse>, Status> {
        let res = match Session::current(&request) {
            Some(session) => SessionResponse {
                signed_in: true,
                user_id: session.user_id.to_string(),
                email: session.email,
                expires_at: session.expires_at.to_rfc3339(),
            },
            None => SessionResponse::default(),
        };
        Ok(Response::new(res))
    }

    async fn sign_out(&self, request: Request<Empty>) -> Result<Response<Empty>, Status> {
        if let Some(session) = Session::current(&request) {
            self.identities
                .revoke_session(session.session_id, session.expires_at)
                .await
                .map_err(|e| e.into_status_with(SIGN_OUT_FAILED))?;
            self.confirmations.clear(session.user_id);
            tracing::info!("Signed out: user_id={}", session.user_id);
        }
        Ok(Response::new(Empty {}))
    }
}
