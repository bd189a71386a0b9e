use std::sync::Arc;

use tonic::server::NamedService;
use tonic::{Request, Response, Status};

use crate::db::{ItemQuery, ItemStore};
use crate::proto::auth::auth_service_server::AuthServiceServer;
use crate::proto::dashboard::dashboard_service_server::DashboardServiceServer;
use crate::proto::health::{
    health_server::Health, HealthCheckRequest, HealthCheckResponse,
    health_check_response::ServingStatus,
};
use crate::proto::items::items_service_server::ItemsServiceServer;

use super::{AuthServiceImpl, DashboardServiceImpl, ItemsServiceImpl};

const KNOWN_SERVICES: [&str; 3] = [
    <ItemsServiceServer<ItemsServiceImpl> as NamedService>::NAME,
    <DashboardServiceServer<DashboardServiceImpl> as NamedService>::NAME,
    <AuthServiceServer<AuthServiceImpl> as NamedService>::NAME,
];

/// Reports `SERVING` while the item store answers queries.
pub struct HealthServiceImpl {
    items: Arc<dyn ItemStore>,
}

impl HealthServiceImpl {
    pub fn new(items: Arc<dyn ItemStore>) -> Self {
        Self { items }
    }

    async fn status_for(&self, service: &str) -> Result<ServingStatus, Status> {
        if !service.is_empty() && !KNOWN_SERVICES.contains(&service) {
            return Err(Status::not_found(format!("unknown service '{}'", service)));
        }

        let probe = ItemQuery {
            limit: Some(1),
            ..Default::default()
        };
        match self.items.list(&probe).await {
            Ok(_) => Ok(ServingStatus::Serving),
            Err(e) => {
                tracing::warn!("Health check failed: {}", e);
                Ok(ServingStatus::NotServing)
            }
        }
    }
}

#[tonic::async_trait]
impl Health for HealthServiceImpl {
    async fn check(
        &self,
        request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        let status = self.status_for(&request.get_ref().service).await?;
        Ok(Response::new(HealthCheckResponse {
            status: status.into(),
        }))
    }

    type WatchStream = tokio_stream::wrappers::ReceiverStream<Result<HealthCheckResponse, Status>>;

    async fn watch(
        &self,
        request: Request<HealthCheckRequest>,
    ) -> Result<Response<Self::WatchStream>, Status> {
        let status = self.status_for(&request.get_ref().service).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);

        tokio::spawn(async move {
            let _ = tx
                .send(Ok(HealthCheckResponse {
                    status: status.into(),
                }))
                .await;
        });

        Ok(Response::new(tokio_stream::wrappers::ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryItemStore;

    fn service() -> HealthServiceImpl {
        HealthServiceImpl::new(Arc::new(MemoryItemStore::new()))
    }

    async fn check(name: &str) -> Result<i32, Status> {
        service()
            .check(Request::new(HealthCheckRequest {
                service: name.into(),
            }))
            .await
            .map(|res| res.into_inner().status)
    }

    #[tokio::test]
    async fn test_serving_for_server_and_known_services() {
        let serving = ServingStatus::Serving as i32;
        assert_eq!(check("").await.unwrap(), serving);
        assert_eq!(check("lostfound.items.ItemsService").await.unwrap(), serving);
        assert_eq!(check("lostfound.auth.AuthService").await.unwrap(), serving);
    }

    #[tokio::test]
    async fn test_unknown_service_is_not_found() {
        let err = check("inventory.ItemsService").await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn test_watch_sends_current_status() {
        use tokio_stream::StreamExt;

        let mut stream = service()
            .watch(Request::new(HealthCheckRequest::default()))
            .await
            .unwrap()
            .into_inner();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.status, ServingStatus::Serving as i32);
    }
}
