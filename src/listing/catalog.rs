/// Sentinel meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All Categories";

/// Sentinel meaning "no campus filter".
pub const ALL_CAMPUSES: &str = "All Campuses";

pub const CATEGORIES: &[&str] = &[
    "Electronics",
    "Clothing",
    "Books",
    "Keys",
    "Wallet/Purse",
    "ID/Cards",
    "Jewelry",
    "Bags/Backpacks",
    "Other",
];

pub const CAMPUSES: &[&str] = &[
    "Baruch College",
    "Brooklyn College",
    "City College",
    "College of Staten Island",
    "Hunter College",
    "John Jay College",
    "Lehman College",
    "Medgar Evers College",
    "NYC College of Technology",
    "Queens College",
    "York College",
    "Other CUNY Campus",
];

pub fn is_known_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

pub fn is_known_campus(campus: &str) -> bool {
    CAMPUSES.contains(&campus)
}
