use std::sync::Arc;

use chrono::Utc;
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::auth::Session;
use crate::db::{ItemQuery, ItemStore};
use crate::listing::catalog::{CAMPUSES, CATEGORIES};
use crate::listing::{BrowseQuery, ItemFilter};
use crate::models::{self, ItemType};
use crate::proto::common::Empty;
use crate::proto::items::items_service_server::ItemsService;
use crate::proto::items::{
    BrowseItemsReq, BrowseItemsRes, CatalogRes, GetItemReq, GetItemRes, Item, ListItemsRes,
    RecentItemsReq, ReportItemReq, ReportItemRes, UpdateItemReq, UpdateItemRes,
};
use crate::proto::items::{ItemForm as ItemFormProto, PhotoUpload as PhotoUploadProto};
use crate::reports::{
    discard_photo, new_report, store_photo, ItemForm, PhotoPolicy, PhotoUpload, SubmitOutcome,
    REPORT_FAILED, UPDATE_FAILED,
};
use crate::storage::StorageBackend;

pub(crate) const LOAD_FAILED: &str = "Failed to load items. Please try again.";

const RECENT_DEFAULT_LIMIT: i64 = 6;
const RECENT_MAX_LIMIT: i64 = 50;

pub(crate) fn item_to_proto(item: &models::Item) -> Item {
    Item {
        id: item.id.to_string(),
        r#type: item.item_type.to_string(),
        title: item.title.clone(),
        description: item.description.clone(),
        category: item.category.clone(),
        campus: item.campus.clone().unwrap_or_default(),
        location: item.location.clone(),
        date_occurred: item.date_occurred.format("%Y-%m-%d").to_string(),
        contact_name: item.contact_name.clone(),
        contact_email: item.contact_email.clone(),
        contact_phone: item.contact_phone.clone().unwrap_or_default(),
        image_url: item.image_url.clone().unwrap_or_default(),
        status: item.status.to_string(),
        created_at: item.created_at.to_rfc3339(),
    }
}

/// Malformed and unknown ids are both just "not found" to the caller.
pub(crate) fn parse_item_id(id: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(id).map_err(|_| Status::not_found("Item not found"))
}

/// Counts saturate at `i32::MAX` on the wire.
pub(crate) fn count_to_proto(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

impl From<ItemFormProto> for ItemForm {
    fn from(form: ItemFormProto) -> Self {
        ItemForm {
            title: form.title,
            description: form.description,
            category: form.category,
            campus: form.campus,
            location: form.location,
            date_occurred: form.date_occurred,
            contact_name: form.contact_name,
            contact_email: form.contact_email,
            contact_phone: form.contact_phone,
        }
    }
}

/// An empty upload message means "no photo".
fn photo_from_proto(photo: Option<PhotoUploadProto>) -> Option<PhotoUpload> {
    photo.filter(|p| !p.data.is_empty()).map(|p| PhotoUpload {
        data: p.data,
        content_type: p.content_type,
    })
}

pub struct ItemsServiceImpl {
    items: Arc<dyn ItemStore>,
    storage: Option<Arc<dyn StorageBackend>>,
    photo_policy: PhotoPolicy,
}

impl ItemsServiceImpl {
    pub fn new(
        items: Arc<dyn ItemStore>,
        storage: Option<Arc<dyn StorageBackend>>,
        photo_policy: PhotoPolicy,
    ) -> Self {
        Self {
            items,
            storage,
            photo_policy,
        }
    }

    fn storage(&self) -> Option<&dyn StorageBackend> {
        self.storage.as_deref()
    }
}

#[tonic::async_trait]
impl ItemsService for ItemsServiceImpl {
    async fn report_item(
        &self,
        request: Request<ReportItemReq>,
    ) -> Result<Response<ReportItemRes>, Status> {
        let session = Session::current(&request);
        let req = request.into_inner();

        let item_type: ItemType = req.r#type.parse()?;
        let fields = ItemForm::from(req.form.unwrap_or_default())
            .with_session_email(session.as_ref())
            .normalize(Utc::now().date_naive(), None)?;
        let mut new_item = new_report(item_type, fields, req.left_at_security)?;

        if let Some(photo) = photo_from_proto(req.photo) {
            let url = store_photo(self.storage(), &photo, &self.photo_policy)
                .await
                .map_err(|e| e.into_status_with(REPORT_FAILED))?;
            new_item.fields.image_url = Some(url);
        }

        let uploaded = new_item.fields.image_url.clone();
        let item = match self.items.insert(new_item).await {
            Ok(item) => item,
            Err(e) => {
                discard_photo(self.storage(), uploaded.as_deref()).await;
                return Err(e.into_status_with(REPORT_FAILED));
            }
        };

        tracing::info!(
            "Item reported: id={}, type={}, status={}",
            item.id,
            item.item_type,
            item.status
        );

        Ok(Response::new(ReportItemRes {
            item: Some(item_to_proto(&item)),
            redirect_to: SubmitOutcome::Reported(item_type).redirect_path(),
        }))
    }

    async fn get_item(
        &self,
        request: Request<GetItemReq>,
    ) -> Result<Response<GetItemRes>, Status> {
        let session = Session::current(&request);
        let id = parse_item_id(&request.get_ref().id)?;

        let item = self
            .items
            .get(id)
            .await
            .map_err(|e| e.into_status_with(LOAD_FAILED))?
            .ok_or_else(|| Status::not_found("Item not found"))?;

        // Returned items are only visible to their owner.
        let is_owner = session
            .as_ref()
            .is_some_and(|s| item.is_owned_by(&s.email));
        if !item.status.is_public() && !is_owner {
            return Err(Status::not_found("Item not found"));
        }

        Ok(Response::new(GetItemRes {
            item: Some(item_to_proto(&item)),
        }))
    }

    async fn update_item(
        &self,
        request: Request<UpdateItemReq>,
    ) -> Result<Response<UpdateItemRes>, Status> {
        let session = Session::require(&request)?;
        let req = request.into_inner();
        let id = parse_item_id(&req.id)?;

        let existing = self
            .items
            .get(id)
            .await
            .map_err(|e| e.into_status_with(UPDATE_FAILED))?
            .ok_or_else(|| Status::not_found("Item not found"))?;
        if !existing.is_owned_by(&session.email) {
            return Err(Status::permission_denied("You can only edit your own items"));
        }

        let photo = photo_from_proto(req.photo);
        if photo.is_some() && req.remove_photo {
            return Err(Status::invalid_argument(
                "cannot upload and remove a photo at the same time",
            ));
        }

        let kept_image = if req.remove_photo {
            None
        } else {
            existing.image_url.clone()
        };
        let mut fields = ItemForm::from(req.form.unwrap_or_default())
            .with_session_email(Some(&session))
            .normalize(Utc::now().date_naive(), kept_image)?;

        let mut uploaded = None;
        if let Some(photo) = photo {
            let url = store_photo(self.storage(), &photo, &self.photo_policy)
                .await
                .map_err(|e| e.into_status_with(UPDATE_FAILED))?;
            fields.image_url = Some(url.clone());
            uploaded = Some(url);
        }

        let updated = match self.items.update_fields(id, &fields).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                discard_photo(self.storage(), uploaded.as_deref()).await;
                return Err(Status::not_found("Item not found"));
            }
            Err(e) => {
                discard_photo(self.storage(), uploaded.as_deref()).await;
                return Err(e.into_status_with(UPDATE_FAILED));
            }
        };

        if existing.image_url != updated.image_url {
            discard_photo(self.storage(), existing.image_url.as_deref()).await;
        }

        tracing::info!("Item updated: id={}, owner={}", id, session.email);

        Ok(Response::new(UpdateItemRes {
            item: Some(item_to_proto(&updated)),
            redirect_to: SubmitOutcome::Updated.redirect_path(),
        }))
    }

    async fn browse_items(
        &self,
        request: Request<BrowseItemsReq>,
    ) -> Result<Response<BrowseItemsRes>, Status> {
        let req = request.into_inner();
        let query = BrowseQuery::parse(&req.query_string);

        // Explicit fields win over the URL's preselection.
        let tab = if req.tab.is_empty() {
            query.tab.unwrap_or_default().as_str().to_string()
        } else {
            req.tab
        };
        let search = if req.search.is_empty() {
            query.search.clone().unwrap_or_default()
        } else {
            req.search
        };

        let filter = ItemFilter::from_form(
            &tab,
            &req.category,
            &req.campus,
            &req.date_from,
            &req.date_to,
            &search,
        )?;

        let items = self
            .items
            .list(&ItemQuery::public())
            .await
            .map_err(|e| e.into_status_with(LOAD_FAILED))?;
        let visible = filter.apply(&items);

        Ok(Response::new(BrowseItemsRes {
            total_count: count_to_proto(visible.len()),
            items: visible.iter().map(item_to_proto).collect(),
            banner: query.banner().unwrap_or_default().to_string(),
            active_tab: filter.tab.as_str().to_string(),
            search: filter.search,
        }))
    }

    async fn list_recent_items(
        &self,
        request: Request<RecentItemsReq>,
    ) -> Result<Response<ListItemsRes>, Status> {
        let req = request.into_inner();

        let item_type = if req.r#type.is_empty() {
            ItemType::Lost
        } else {
            req.r#type.parse()?
        };
        let limit = match i64::from(req.limit) {
            l if l <= 0 => RECENT_DEFAULT_LIMIT,
            l => l.min(RECENT_MAX_LIMIT),
        };

        let items = self
            .items
            .list(&ItemQuery::recent(item_type, limit))
            .await
            .map_err(|e| e.into_status_with(LOAD_FAILED))?;

        Ok(Response::new(ListItemsRes {
            items: items.iter().map(item_to_proto).collect(),
        }))
    }

    async fn get_catalog(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<CatalogRes>, Status> {
        Ok(Response::new(CatalogRes {
            categories: CATEGORIES.iter().map(|c| c.to_string()).collect(),
            campuses: CAMPUSES.iter().map(|c| c.to_string()).collect(),
        }))
    }
}
