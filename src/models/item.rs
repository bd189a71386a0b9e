use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Lost,
    Found,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Lost => "lost",
            ItemType::Found => "found",
        }
    }
}

impl FromStr for ItemType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lost" => Ok(ItemType::Lost),
            "found" => Ok(ItemType::Found),
            other => Err(AppError::InvalidInput(format!(
                "type must be 'lost' or 'found', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Active,
    AtSecurity,
    Returned,
}

impl ItemStatus {
    /// Statuses shown on the public browse page.
    pub const PUBLIC: [ItemStatus; 2] = [ItemStatus::Active, ItemStatus::AtSecurity];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::AtSecurity => "at_security",
            ItemStatus::Returned => "returned",
        }
    }

    pub fn is_public(&self) -> bool {
        Self::PUBLIC.contains(self)
    }
}

impl FromStr for ItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ItemStatus::Active),
            "at_security" => Ok(ItemStatus::AtSecurity),
            "returned" => Ok(ItemStatus::Returned),
            other => Err(AppError::InvalidInput(format!("unknown status '{}'", other))),
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lost or found report as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: Uuid,
    pub item_type: ItemType,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Older rows predate the campus field.
    pub campus: Option<String>,
    pub location: String,
    pub date_occurred: NaiveDate,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub image_url: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.contact_email.eq_ignore_ascii_case(email)
    }

    /// Overwrites every user-editable field. Identity, type, status and
    /// creation time are left alone.
    pub fn apply_fields(&mut self, fields: &ItemFields) {
        self.title = fields.title.clone();
        self.description = fields.description.clone();
        self.category = fields.category.clone();
        self.campus = Some(fields.campus.clone());
        self.location = fields.location.clone();
        self.date_occurred = fields.date_occurred;
        self.contact_name = fields.contact_name.clone();
        self.contact_email = fields.contact_email.clone();
        self.contact_phone = fields.contact_phone.clone();
        self.image_url = fields.image_url.clone();
    }
}

/// Normalized, validated user-editable fields of an item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    pub title: String,
    pub description: String,
    pub category: String,
    pub campus: String,
    pub location: String,
    pub date_occurred: NaiveDate,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub image_url: Option<String>,
}

/// A record ready for insertion; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub fields: ItemFields,
}

/// Row shape of the `items` table.
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub item_type: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub campus: Option<String>,
    pub location: String,
    pub date_occurred: NaiveDate,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let item_type = row
            .item_type
            .parse()
            .map_err(|_| AppError::Internal(format!("corrupt item type on {}", row.id)))?;
        let status = row
            .status
            .parse()
            .map_err(|_| AppError::Internal(format!("corrupt item status on {}", row.id)))?;

        Ok(Item {
            id: row.id,
            item_type,
            title: row.title,
            description: row.description,
            category: row.category,
            campus: row.campus,
            location: row.location,
            date_occurred: row.date_occurred,
            contact_name: row.contact_name,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            image_url: row.image_url,
            status,
            created_at: row.created_at,
        })
    }
}
