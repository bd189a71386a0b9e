use chrono::NaiveDate;

use crate::error::{AppError, AppResult};
use crate::models::{Item, ItemType};

use super::catalog::{ALL_CAMPUSES, ALL_CATEGORIES};

/// Browse page tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    All,
    Lost,
    Found,
}

impl Tab {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Tab::All),
            "lost" => Some(Tab::Lost),
            "found" => Some(Tab::Found),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::All => "all",
            Tab::Lost => "lost",
            Tab::Found => "found",
        }
    }

    pub fn matches(&self, item_type: ItemType) -> bool {
        match self {
            Tab::All => true,
            Tab::Lost => item_type == ItemType::Lost,
            Tab::Found => item_type == ItemType::Found,
        }
    }
}

/// Criteria narrowing a fetched item list. Every criterion is optional and
/// they combine with AND. The default filter lets everything through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    pub tab: Tab,
    pub category: Option<String>,
    pub campus: Option<String>,
    /// Inclusive.
    pub date_from: Option<NaiveDate>,
    /// Inclusive.
    pub date_to: Option<NaiveDate>,
    pub search: String,
}

fn parse_date(field: &str, value: &str) -> AppResult<Option<NaiveDate>> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| AppError::InvalidInput(format!("{} must be a YYYY-MM-DD date", field)))
}

fn selection(value: &str, sentinel: &str) -> Option<String> {
    if value.is_empty() || value == sentinel {
        None
    } else {
        Some(value.to_string())
    }
}

impl ItemFilter {
    /// Builds a filter from raw form values. Empty strings and the
    /// "All Categories"/"All Campuses" sentinels disable their criterion.
    pub fn from_form(
        tab: &str,
        category: &str,
        campus: &str,
        date_from: &str,
        date_to: &str,
        search: &str,
    ) -> AppResult<Self> {
        let tab = if tab.is_empty() {
            Tab::All
        } else {
            Tab::parse(tab).ok_or_else(|| {
                AppError::InvalidInput("tab must be 'all', 'lost' or 'found'".into())
            })?
        };

        Ok(Self {
            tab,
            category: selection(category, ALL_CATEGORIES),
            campus: selection(campus, ALL_CAMPUSES),
            date_from: parse_date("date_from", date_from)?,
            date_to: parse_date("date_to", date_to)?,
            search: search.to_string(),
        })
    }

    pub fn matches(&self, item: &Item) -> bool {
        if !self.tab.matches(item.item_type) {
            return false;
        }
        if let Some(category) = &self.category {
            if &item.category != category {
                return false;
            }
        }
        if let Some(campus) = &self.campus {
            if item.campus.as_ref() != Some(campus) {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if item.date_occurred < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if item.date_occurred > to {
                return false;
            }
        }
        if !self.search.is_empty() {
            let query = self.search.to_lowercase();
            let hit = [&item.title, &item.description, &item.location]
                .iter()
                .any(|field| field.to_lowercase().contains(&query));
            if !hit {
                return false;
            }
        }
        true
    }

    /// Order-preserving subsequence of `items` matching every criterion.
    pub fn apply<'a, I>(&self, items: I) -> Vec<Item>
    where
        I: IntoIterator<Item = &'a Item>,
    {
        items
            .into_iter()
            .filter(|item| self.matches(item))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemStatus;
    use chrono::Utc;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn item(item_type: ItemType, title: &str, category: &str, campus: Option<&str>, day: &str) -> Item {
        Item {
            id: Uuid::new_v4(),
            item_type,
            title: title.into(),
            description: String::new(),
            category: category.into(),
            campus: campus.map(Into::into),
            location: String::new(),
            date_occurred: date(day),
            contact_name: "A".into(),
            contact_email: "a@cuny.edu".into(),
            contact_phone: None,
            image_url: None,
            status: ItemStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<Item> {
        vec![
            item(ItemType::Lost, "Blue Backpack", "Bags/Backpacks", Some("Hunter College"), "2024-03-10"),
            item(ItemType::Found, "Car keys", "Keys", Some("Baruch College"), "2024-03-05"),
            item(ItemType::Lost, "iPhone 13", "Electronics", None, "2024-02-20"),
            item(ItemType::Found, "Calculus textbook", "Books", Some("Hunter College"), "2024-01-15"),
        ]
    }

    fn titles(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_default_filter_is_identity() {
        let items = sample();
        let filter = ItemFilter::from_form("all", ALL_CATEGORIES, ALL_CAMPUSES, "", "", "").unwrap();
        assert_eq!(filter, ItemFilter::default());
        assert_eq!(filter.apply(&items), items);
    }

    #[test]
    fn test_empty_list_yields_empty() {
        let filter = ItemFilter {
            search: "keys".into(),
            ..Default::default()
        };
        assert!(filter.apply(&Vec::<Item>::new()).is_empty());
    }

    #[test]
    fn test_tab_filters_by_type() {
        let items = sample();
        let filter = ItemFilter {
            tab: Tab::Found,
            ..Default::default()
        };
        assert_eq!(titles(&filter.apply(&items)), vec!["Car keys", "Calculus textbook"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let items = vec![item(ItemType::Lost, "Blue Backpack", "Bags/Backpacks", None, "2024-01-01")];
        for query in ["blue", "BLUE", "bAcKp"] {
            let filter = ItemFilter {
                search: query.into(),
                ..Default::default()
            };
            assert_eq!(filter.apply(&items).len(), 1, "query {}", query);
        }
    }

    #[test]
    fn test_search_matches_any_of_three_fields() {
        let mut by_location = item(ItemType::Lost, "Umbrella", "Other", None, "2024-01-01");
        by_location.location = "Library 3rd floor".into();
        let mut by_description = item(ItemType::Lost, "Umbrella", "Other", None, "2024-01-01");
        by_description.description = "left near the library entrance".into();
        let unrelated = item(ItemType::Lost, "Umbrella", "Other", None, "2024-01-01");

        let items = vec![by_location.clone(), by_description.clone(), unrelated];
        let filter = ItemFilter {
            search: "Library".into(),
            ..Default::default()
        };
        assert_eq!(filter.apply(&items), vec![by_location, by_description]);
    }

    #[test]
    fn test_category_and_campus_are_exact() {
        let items = sample();
        let filter = ItemFilter::from_form("", "Books", "Hunter College", "", "", "").unwrap();
        assert_eq!(titles(&filter.apply(&items)), vec!["Calculus textbook"]);

        let partial = ItemFilter::from_form("", "Book", "", "", "", "").unwrap();
        assert!(partial.apply(&items).is_empty());
    }

    #[test]
    fn test_missing_campus_never_matches_a_selected_campus() {
        let items = sample();
        let filter = ItemFilter::from_form("lost", "", "Hunter College", "", "", "").unwrap();
        assert_eq!(titles(&filter.apply(&items)), vec!["Blue Backpack"]);
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let items = sample();
        let filter = ItemFilter::from_form("", "", "", "2024-02-20", "2024-03-05", "").unwrap();
        assert_eq!(titles(&filter.apply(&items)), vec!["Car keys", "iPhone 13"]);

        let only_from = ItemFilter::from_form("", "", "", "2024-03-06", "", "").unwrap();
        assert_eq!(titles(&only_from.apply(&items)), vec!["Blue Backpack"]);
    }

    #[test]
    fn test_inverted_date_range_is_empty() {
        let items = sample();
        let filter = ItemFilter::from_form("", "", "", "2024-12-31", "2024-01-01", "").unwrap();
        assert!(filter.apply(&items).is_empty());
    }

    #[test]
    fn test_output_is_ordered_subset() {
        let items = sample();
        let filter = ItemFilter {
            search: "c".into(),
            ..Default::default()
        };
        let out = filter.apply(&items);
        let mut cursor = items.iter();
        for kept in &out {
            assert!(cursor.any(|i| i == kept), "{} out of order or invented", kept.title);
        }
        assert_eq!(filter.apply(&items), out);
    }

    #[test]
    fn test_bad_input_is_rejected() {
        assert!(ItemFilter::from_form("misplaced", "", "", "", "", "").is_err());
        assert!(ItemFilter::from_form("", "", "", "03/05/2024", "", "").is_err());
    }
}
