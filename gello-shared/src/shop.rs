/// Points-shop catalog
///
/// The catalog is static for the life of the process: a built-in default set
/// of rewards, replaceable from configuration. Redeeming an item spends its
/// `cost` from the caller's balance through a `shop_redemption` ledger row.
///
/// # Example
///
/// ```
/// use gello_shared::shop::ShopCatalog;
///
/// let catalog = ShopCatalog::default();
/// let coffee = catalog.find("coffee").unwrap();
/// assert!(coffee.cost > 0);
/// assert!(catalog.find("unknown").is_none());
/// ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Redeemable reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    /// Stable identifier used in URLs
    pub id: String,

    /// Display name
    pub name: String,

    /// What the reward is
    #[serde(default)]
    pub description: String,

    /// Price in points
    pub cost: i64,
}

/// Error type for catalog validation
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Shop item '{0}' has an empty id")]
    EmptyId(String),

    #[error("Shop item '{0}' must cost at least 1 point")]
    NonPositiveCost(String),

    #[error("Shop item id '{0}' is used more than once")]
    DuplicateId(String),
}

/// Immutable set of shop items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopCatalog {
    items: Vec<ShopItem>,
}

fn item(id: &str, name: &str, description: &str, cost: i64) -> ShopItem {
    ShopItem {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        cost,
    }
}

impl Default for ShopCatalog {
    fn default() -> Self {
        Self {
            items: vec![
                item("coffee", "Coffee on the team", "A coffee of your choice", 10),
                item("lunch", "Team lunch pick", "Choose where the team goes for lunch", 50),
                item("late-start", "Late start", "Start two hours later one morning", 100),
                item("day-off", "Extra day off", "One additional day of paid leave", 500),
            ],
        }
    }
}

impl ShopCatalog {
    /// Builds a catalog, rejecting empty ids, free items and duplicate ids
    pub fn new(items: Vec<ShopItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();

        for item in &items {
            if item.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(item.name.clone()));
            }
            if item.cost <= 0 {
                return Err(CatalogError::NonPositiveCost(item.id.clone()));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
        }

        Ok(Self { items })
    }

    /// All items in catalog order
    pub fn items(&self) -> &[ShopItem] {
        &self.items
    }

    /// Looks an item up by id
    pub fn find(&self, id: &str) -> Option<&ShopItem> {
        self.items.iter().find(|item| item.id == id)
    }
}
