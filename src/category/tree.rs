//! Assembly of flat category rows into the two-level display tree.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    category::Category,
    database_id::{CategoryId, OwnerId},
};

/// A primary category with its subcategories gathered beneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryCategory {
    /// The ID of the primary category.
    pub id: CategoryId,
    /// The display name of the primary category.
    pub name: String,
    /// The owner namespace the category belongs to.
    pub owner: OwnerId,
    /// The subcategories that sit under this primary.
    pub subcategories: Vec<Category>,
}

/// Group flat category rows into primary categories with their
/// subcategories attached.
///
/// Subcategories whose parent is not in `categories` are dropped; the
/// two-level invariant means this only happens for rows caught mid-delete.
pub fn assemble_primary_categories(categories: Vec<Category>) -> Vec<PrimaryCategory> {
    let mut primaries = Vec::new();
    let mut subcategories: HashMap<CategoryId, Vec<Category>> = HashMap::new();

    for category in categories {
        match category.parent_category {
            Some(parent_id) => subcategories.entry(parent_id).or_default().push(category),
            None => primaries.push(category),
        }
    }

    primaries
        .into_iter()
        .map(|category| PrimaryCategory {
            id: category.id,
            name: category.name,
            owner: category.owner,
            subcategories: subcategories.remove(&category.id).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::category::Category;

    use super::assemble_primary_categories;

    fn category(id: i64, name: &str, parent: Option<i64>) -> Category {
        Category {
            id,
            name: name.to_owned(),
            parent_category: parent,
            owner: 1,
        }
    }

    #[test]
    fn groups_subcategories_under_their_primary() {
        let rows = vec![
            category(1, "Food", None),
            category(2, "Restaurants", Some(1)),
            category(3, "Groceries", Some(1)),
            category(4, "Travel", None),
        ];

        let primaries = assemble_primary_categories(rows);

        assert_eq!(primaries.len(), 2);
        assert_eq!(primaries[0].name, "Food");
        assert_eq!(primaries[0].subcategories.len(), 2);
        assert_eq!(primaries[1].name, "Travel");
        assert!(primaries[1].subcategories.is_empty());
    }

    #[test]
    fn orphaned_subcategories_are_dropped() {
        let rows = vec![category(2, "Restaurants", Some(99))];

        let primaries = assemble_primary_categories(rows);

        assert!(primaries.is_empty());
    }

    #[test]
    fn empty_input_produces_empty_output() {
        assert!(assemble_primary_categories(Vec::new()).is_empty());
    }
}
