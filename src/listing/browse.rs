use crate::models::ItemType;

use super::filter::Tab;

/// Parameters the browse page accepts in its URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseQuery {
    /// Set after a report was submitted; drives the confirmation banner.
    pub success: Option<ItemType>,
    /// Preselected tab. Only `lost` and `found` are honored.
    pub tab: Option<Tab>,
    /// Preseeded search text.
    pub search: Option<String>,
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

impl BrowseQuery {
    /// Parses a query string such as `success=lost&tab=found&search=keys`.
    /// A leading `?` is ignored, unknown keys and values are dropped.
    pub fn parse(query: &str) -> Self {
        let mut parsed = BrowseQuery::default();

        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (decode(k), decode(v)),
                None => (decode(pair), String::new()),
            };

            match key.as_str() {
                "success" => {
                    parsed.success = value.parse().ok();
                }
                "tab" => {
                    parsed.tab = match value.as_str() {
                        "lost" => Some(Tab::Lost),
                        "found" => Some(Tab::Found),
                        _ => None,
                    };
                }
                "search" if !value.is_empty() => {
                    parsed.search = Some(value);
                }
                _ => {}
            }
        }

        parsed
    }

    pub fn banner(&self) -> Option<&'static str> {
        self.success.map(|t| match t {
            ItemType::Lost => "Your lost item report has been submitted successfully!",
            ItemType::Found => "Thank you for reporting the found item!",
        })
    }
}
