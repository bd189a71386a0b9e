use chrono::NaiveDate;

use crate::auth::{is_valid_email, normalize_email, Session};
use crate::error::{AppError, AppResult};
use crate::listing::catalog::{is_known_campus, is_known_category};
use crate::models::{ItemFields, ItemStatus, ItemType, NewItem};

pub const REPORT_FAILED: &str = "Failed to submit report. Please try again.";
pub const UPDATE_FAILED: &str = "Failed to update item. Please try again.";

/// Raw report/edit form input, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub campus: String,
    pub location: String,
    pub date_occurred: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

impl ItemForm {
    /// Signed-in reporters always report under their account email.
    pub fn with_session_email(mut self, session: Option<&Session>) -> Self {
        if let Some(session) = session {
            self.contact_email = session.email.clone();
        }
        self
    }

    /// Validates the form and maps it onto the stored field set. `today`
    /// bounds the occurrence date. The photo is resolved separately.
    pub fn normalize(&self, today: NaiveDate, image_url: Option<String>) -> AppResult<ItemFields> {
        let title = required("title", &self.title)?;
        let description = required("description", &self.description)?;

        let category = required("category", &self.category)?;
        if !is_known_category(&category) {
            return Err(AppError::InvalidInput(format!("unknown category '{}'", category)));
        }
        let campus = required("campus", &self.campus)?;
        if !is_known_campus(&campus) {
            return Err(AppError::InvalidInput(format!("unknown campus '{}'", campus)));
        }

        let location = required("location", &self.location)?;

        let date_raw = required("date_occurred", &self.date_occurred)?;
        let date_occurred = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d").map_err(|_| {
            AppError::InvalidInput("date_occurred must be a YYYY-MM-DD date".into())
        })?;
        if date_occurred > today {
            return Err(AppError::InvalidInput(
                "date_occurred cannot be in the future".into(),
            ));
        }

        let contact_name = required("contact_name", &self.contact_name)?;
        let contact_email = normalize_email(&required("contact_email", &self.contact_email)?);
        if !is_valid_email(&contact_email) {
            return Err(AppError::InvalidInput(
                "contact_email must be a valid email address".into(),
            ));
        }

        let phone = self.contact_phone.trim();
        let contact_phone = (!phone.is_empty()).then(|| phone.to_string());

        Ok(ItemFields {
            title,
            description,
            category,
            campus,
            location,
            date_occurred,
            contact_name,
            contact_email,
            contact_phone,
            image_url,
        })
    }
}

/// Builds the record for a new report. Found items handed to campus
/// security start out `at_security`; everything else starts `active`.
pub fn new_report(
    item_type: ItemType,
    fields: ItemFields,
    left_at_security: bool,
) -> AppResult<NewItem> {
    let status = match (item_type, left_at_security) {
        (ItemType::Found, true) => ItemStatus::AtSecurity,
        (ItemType::Lost, true) => {
            return Err(AppError::InvalidInput(
                "only found items can be left at security".into(),
            ))
        }
        (_, false) => ItemStatus::Active,
    };

    Ok(NewItem {
        item_type,
        status,
        fields,
    })
}

/// Where the client goes after a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Reported(ItemType),
    Updated,
}

impl SubmitOutcome {
    pub fn redirect_path(&self) -> String {
        let flag = match self {
            SubmitOutcome::Reported(t) => t.as_str(),
            SubmitOutcome::Updated => "updated",
        };
        format!("/dashboard?success={}", flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn keys_form() -> ItemForm {
        ItemForm {
            title: "Keys".into(),
            description: "Ring with three keys".into(),
            category: "Keys".into(),
            campus: "Hunter College".into(),
            location: "Gym".into(),
            date_occurred: "2024-01-01".into(),
            contact_name: "A".into(),
            contact_email: "a@cuny.edu".into(),
            contact_phone: String::new(),
        }
    }

    #[test]
    fn test_normalizes_valid_form() {
        let fields = keys_form().normalize(today(), None).unwrap();
        assert_eq!(fields.title, "Keys");
        assert_eq!(fields.campus, "Hunter College");
        assert_eq!(fields.date_occurred, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(fields.contact_email, "a@cuny.edu");
        assert_eq!(fields.contact_phone, None);
    }

    #[test]
    fn test_blank_required_field_is_rejected() {
        let mut form = keys_form();
        form.location = "   ".into();
        let err = form.normalize(today(), None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: location is required");
    }

    #[test]
    fn test_future_date_is_rejected() {
        let mut form = keys_form();
        form.date_occurred = "2024-06-02".into();
        assert!(form.normalize(today(), None).is_err());

        form.date_occurred = "2024-06-01".into();
        assert!(form.normalize(today(), None).is_ok());
    }

    #[test]
    fn test_unknown_catalog_values_are_rejected() {
        let mut form = keys_form();
        form.category = "Pets".into();
        assert!(form.normalize(today(), None).is_err());

        let mut form = keys_form();
        form.campus = "Columbia".into();
        assert!(form.normalize(today(), None).is_err());
    }

    #[test]
    fn test_session_email_wins_over_typed_email() {
        let session = Session {
            user_id: Uuid::new_v4(),
            email: "owner@hunter.cuny.edu".into(),
            session_id: Uuid::new_v4(),
            expires_at: Utc::now(),
        };
        let mut form = keys_form();
        form.contact_email = "someone@else.edu".into();

        let fields = form
            .with_session_email(Some(&session))
            .normalize(today(), None)
            .unwrap();
        assert_eq!(fields.contact_email, "owner@hunter.cuny.edu");

        let anonymous = keys_form().with_session_email(None).normalize(today(), None).unwrap();
        assert_eq!(anonymous.contact_email, "a@cuny.edu");
    }

    #[test]
    fn test_optional_phone_is_kept() {
        let mut form = keys_form();
        form.contact_phone = " 212-555-0100 ".into();
        let fields = form.normalize(today(), None).unwrap();
        assert_eq!(fields.contact_phone.as_deref(), Some("212-555-0100"));
    }

    #[test]
    fn test_new_report_status() {
        let fields = keys_form().normalize(today(), None).unwrap();
        assert_eq!(
            new_report(ItemType::Lost, fields.clone(), false).unwrap().status,
            ItemStatus::Active
        );
        assert_eq!(
            new_report(ItemType::Found, fields.clone(), true).unwrap().status,
            ItemStatus::AtSecurity
        );
        assert!(new_report(ItemType::Lost, fields, true).is_err());
    }

    #[test]
    fn test_redirect_paths() {
        assert_eq!(
            SubmitOutcome::Reported(ItemType::Lost).redirect_path(),
            "/dashboard?success=lost"
        );
        assert_eq!(SubmitOutcome::Updated.redirect_path(), "/dashboard?success=updated");
    }
}
