use serde::{Deserialize, Serialize};

use salesdate_core::CustomerId;

/// Customer reference data (read-only for this service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Case-insensitive substring filter on customer display names.
///
/// An absent or blank needle matches every customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    needle: Option<String>,
}

impl NameFilter {
    pub fn new(needle: Option<&str>) -> Self {
        let needle = needle
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase);
        Self { needle }
    }

    pub fn any() -> Self {
        Self::default()
    }

    /// Lower-cased needle, `None` when the filter accepts everything.
    pub fn needle(&self) -> Option<&str> {
        self.needle.as_deref()
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => name.to_lowercase().contains(needle.as_str()),
        }
    }
}
