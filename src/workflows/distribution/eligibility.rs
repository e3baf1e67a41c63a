use serde::Deserialize;

use super::domain::{Family, FamilyStatus};

/// Status facet applied when listing families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Blocked,
}

impl StatusFilter {
    fn matches(self, status: FamilyStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => status == FamilyStatus::Active,
            StatusFilter::Blocked => status == FamilyStatus::Blocked,
        }
    }
}

/// Filter the family list by status facet and free-text search.
///
/// Pure and order-preserving: a family is kept when the status matches and
/// the search term is empty, a case-insensitive substring of the name, or a
/// verbatim substring of the phone number.
pub fn filter_families<'a>(
    families: &'a [Family],
    filter: StatusFilter,
    search: &str,
) -> Vec<&'a Family> {
    let needle = search.trim().to_lowercase();

    families
        .iter()
        .filter(|family| filter.matches(family.status))
        .filter(|family| {
            needle.is_empty()
                || family.name.to_lowercase().contains(&needle)
                || family.phone.contains(search.trim())
        })
        .collect()
}
