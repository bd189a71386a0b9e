//! Report and edit submissions: form normalization and photo handling.

pub mod form;
pub mod photo;

pub use form::{new_report, ItemForm, SubmitOutcome, REPORT_FAILED, UPDATE_FAILED};
pub use photo::{discard_photo, store_photo, PhotoPolicy, PhotoUpload};
