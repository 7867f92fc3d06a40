use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub industry: String,
    pub categories: Vec<String>,
}

static CATEGORIES: LazyLock<Vec<CategoryGroup>> = LazyLock::new(|| {
    serde_json::from_str(include_res!(str, "/categories.json")).unwrap_or_else(|err| {
        tracing::error!(%err, "bundled category catalogue is malformed");
        Vec::new()
    })
});

/// Community categories grouped by industry.
pub fn categories() -> &'static [CategoryGroup] {
    &CATEGORIES
}

pub fn is_known_category(category: &str) -> bool {
    categories()
        .iter()
        .any(|group| group.categories.iter().any(|c| c == category))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_grouped() {
        let groups = categories();
        assert_eq!(groups.len(), 16);
        assert_eq!(groups[0].industry, "Construction & Building");
        assert!(groups.iter().all(|g| !g.categories.is_empty()));
    }

    #[test]
    fn known_categories() {
        assert!(is_known_category("Bakeries & Sweets"));
        assert!(is_known_category("Announcements"));
        assert!(!is_known_category("Food"));
    }
}
