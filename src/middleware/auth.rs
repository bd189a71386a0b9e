use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::HeaderValue;
use http::Request as HttpRequest;
use http::Response as HttpResponse;
use http_body_util::combinators::UnsyncBoxBody;
use tonic::Status;
use tower::{Layer, Service};

use crate::auth::{Session, SessionKeys};
use crate::db::IdentityStore;

/// Paths that never look at the bearer token.
const PUBLIC_PATHS: &[&str] = &[
    "/lostfound.auth.AuthService/SignUp",
    "/lostfound.auth.AuthService/Login",
    "/grpc.health.v1.Health/Check",
    "/grpc.health.v1.Health/Watch",
    "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo",
    "/grpc.reflection.v1alpha.ServerReflection/ServerReflectionInfo",
];

/// Resolves the bearer token into a [`Session`] extension. Requests without
/// a valid, unrevoked token pass through anonymously; handlers that need a
/// session reject them with `Session::require`.
#[derive(Clone)]
pub struct AuthLayer {
    keys: Arc<SessionKeys>,
    identities: Arc<dyn IdentityStore>,
}

impl AuthLayer {
    pub fn new(keys: Arc<SessionKeys>, identities: Arc<dyn IdentityStore>) -> Self {
        Self { keys, identities }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            keys: self.keys.clone(),
            identities: self.identities.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    keys: Arc<SessionKeys>,
    identities: Arc<dyn IdentityStore>,
}

type BoxBody = UnsyncBoxBody<bytes::Bytes, Status>;

fn grpc_status_response(status: Status) -> HttpResponse<BoxBody> {
    let code = status.code() as i32;
    let message = status.message().to_string();

    let mut response = HttpResponse::new(UnsyncBoxBody::default());
    response.headers_mut().insert(
        "content-type",
        HeaderValue::from_static("application/grpc"),
    );
    response
        .headers_mut()
        .insert("grpc-status", HeaderValue::from(code));
    if !message.is_empty() {
        if let Ok(val) = HeaderValue::from_str(&message) {
            response.headers_mut().insert("grpc-message", val);
        }
    }
    response
}

fn bearer_token<B>(req: &HttpRequest<B>) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `Ok(None)` for missing, invalid, expired or revoked tokens, and for
/// tokens whose account has since been deleted. Only a failing store lookup
/// is an error.
async fn resolve_session(
    keys: &SessionKeys,
    identities: &dyn IdentityStore,
    token: Option<&str>,
) -> Result<Option<Session>, Status> {
    let Some(session) = token.and_then(|t| keys.verify(t)) else {
        return Ok(None);
    };

    let unavailable = |e: crate::AppError| {
        tracing::error!("Session lookup failed: {}", e);
        Status::unavailable("Unable to verify session. Please try again.")
    };

    if identities
        .is_session_revoked(session.session_id)
        .await
        .map_err(unavailable)?
    {
        tracing::debug!("Revoked session presented: session_id={}", session.session_id);
        return Ok(None);
    }

    if !identities
        .user_exists(session.user_id)
        .await
        .map_err(unavailable)?
    {
        tracing::debug!("Session for deleted account presented: user_id={}", session.user_id);
        return Ok(None);
    }

    Ok(Some(session))
}

impl<S, ReqBody> Service<HttpRequest<ReqBody>> for AuthMiddleware<S>
where
    S: Service<HttpRequest<ReqBody>, Response = HttpResponse<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = HttpResponse<BoxBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: HttpRequest<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();
        std::mem::swap(&mut self.inner, &mut inner);

        let keys = self.keys.clone();
        let identities = self.identities.clone();

        Box::pin(async move {
            if PUBLIC_PATHS.contains(&req.uri().path()) {
                return inner.call(req).await;
            }

            let token = bearer_token(&req);
            match resolve_session(&keys, identities.as_ref(), token.as_deref()).await {
                Ok(Some(session)) => {
                    tracing::debug!(
                        "gRPC request: path={}, user_id={}",
                        req.uri().path(),
                        session.user_id
                    );
                    req.extensions_mut().insert(session);
                }
                Ok(None) => {
                    tracing::debug!("gRPC request: path={}, anonymous", req.uri().path());
                }
                Err(status) => return Ok(grpc_status_response(status)),
            }

            inner.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::MemoryIdentityStore;
    use crate::models::AppUser;

    async fn signed_up(identities: &MemoryIdentityStore) -> AppUser {
        identities.create_user("a@cuny.edu", "hash").await.unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let req = HttpRequest::builder()
            .header("authorization", "Bearer abc.def")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def"));

        let req = HttpRequest::builder()
            .header("authorization", "Basic abc")
            .body(())
            .unwrap();
        assert_eq!(bearer_token(&req), None);
        assert_eq!(bearer_token(&HttpRequest::new(())), None);
    }

    #[tokio::test]
    async fn test_valid_token_resolves_until_revoked() {
        let keys = SessionKeys::new("secret", 1);
        let identities = MemoryIdentityStore::new();
        let (token, issued) = keys.issue(&signed_up(&identities).await).unwrap();

        let session = resolve_session(&keys, &identities, Some(&token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.session_id, issued.session_id);

        identities
            .revoke_session(issued.session_id, issued.expires_at)
            .await
            .unwrap();
        assert_eq!(resolve_session(&keys, &identities, Some(&token)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_token_is_anonymous() {
        let keys = SessionKeys::new("secret", 1);
        let identities = MemoryIdentityStore::new();
        assert_eq!(resolve_session(&keys, &identities, Some("nope")).await.unwrap(), None);
        assert_eq!(resolve_session(&keys, &identities, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_every_token_dies_with_its_account() {
        let keys = SessionKeys::new("secret", 1);
        let identities = MemoryIdentityStore::new();
        let user = signed_up(&identities).await;
        let (laptop, _) = keys.issue(&user).unwrap();
        let (phone, _) = keys.issue(&user).unwrap();

        assert!(resolve_session(&keys, &identities, Some(&phone)).await.unwrap().is_some());
        identities.delete_user(user.id).await.unwrap();

        for token in [&laptop, &phone] {
            assert_eq!(resolve_session(&keys, &identities, Some(token)).await.unwrap(), None);
        }

        // Signing up again with the same email does not revive the old tokens.
        identities.create_user("a@cuny.edu", "hash").await.unwrap();
        assert_eq!(resolve_session(&keys, &identities, Some(&phone)).await.unwrap(), None);
    }

    #[test]
    fn test_status_response_headers() {
        let res = grpc_status_response(Status::unavailable("try later"));
        assert_eq!(res.headers()["grpc-status"], "14");
        assert_eq!(res.headers()["grpc-message"], "try later");
    }
}
