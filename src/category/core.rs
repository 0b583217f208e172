//! Core category model, invariants, and database queries.

use std::collections::{HashMap, HashSet};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{CategoryId, OwnerId},
    pagination::{PagedResults, page_offset},
};

/// The owner id that the reserved category rows are seeded under.
///
/// Reserved rows are visible to every owner.
pub const SYSTEM_OWNER: OwnerId = 0;

/// A label for grouping transactions and budgets.
///
/// Categories form a two-level tree: a category with no parent is a
/// primary category, and one with a parent is a subcategory of that
/// primary. Deeper nesting is rejected at the create/update boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name of the category.
    pub name: String,
    /// The primary category this category sits under, if any.
    pub parent_category: Option<CategoryId>,
    /// The owner namespace the category belongs to.
    pub owner: OwnerId,
}

/// The fields accepted when creating or updating a category.
///
/// A missing `id` creates a new category; a present `id` updates an
/// existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    /// The ID of the category to update, or `None` to create one.
    pub id: Option<CategoryId>,
    /// The display name of the category.
    pub name: String,
    /// The primary category this category sits under, if any.
    pub parent_category: Option<CategoryId>,
    /// The owner namespace the category belongs to.
    pub owner: OwnerId,
}

/// The ids of the category rows every database is seeded with.
///
/// These are injected configuration rather than hard-coded sentinels so
/// that the modules consuming them do not couple to magic values. The
/// defaults match the rows [seed_reserved_categories] creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedCategories {
    /// Revenue rather than expense. Subcategories of this category are
    /// treated as income too.
    pub income: CategoryId,
    /// Where transactions land when neither the user nor a rule has
    /// classified them.
    pub uncategorized: CategoryId,
    /// The synthetic report entry that absorbs spending no budget covers.
    pub unallocated: CategoryId,
}

impl Default for ReservedCategories {
    fn default() -> Self {
        Self {
            income: 1,
            uncategorized: 2,
            unallocated: 3,
        }
    }
}

impl ReservedCategories {
    /// Whether `id` refers to one of the reserved categories.
    pub fn contains(&self, id: CategoryId) -> bool {
        id == self.income || id == self.uncategorized || id == self.unallocated
    }
}

/// Create the category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                parent_category INTEGER,
                owner INTEGER NOT NULL,
                FOREIGN KEY(parent_category) REFERENCES category(id) ON DELETE SET NULL
                );",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_category_owner ON category(owner);",
        (),
    )?;

    Ok(())
}

/// Insert the reserved category rows if they are not already present.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn seed_reserved_categories(
    connection: &Connection,
    reserved: &ReservedCategories,
) -> Result<(), rusqlite::Error> {
    let seeds = [
        (reserved.income, "Income"),
        (reserved.uncategorized, "Uncategorized"),
        (reserved.unallocated, "Unallocated"),
    ];

    for (id, name) in seeds {
        connection.execute(
            "INSERT OR IGNORE INTO category (id, name, parent_category, owner)
             VALUES (?1, ?2, NULL, ?3);",
            (id, name, SYSTEM_OWNER),
        )?;
    }

    Ok(())
}

/// Create or update a category, enforcing the two-level tree invariants.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the name is empty, the parent is itself a
///   subcategory, or the category being updated has subcategories and
///   would become a subcategory,
/// - [Error::ReservedCategory] if the id refers to a reserved category,
/// - [Error::InvalidCategory] if the parent does not exist,
/// - [Error::UpdateMissingCategory] if the id refers to no category,
/// - or [Error::Sql] if there is some other SQL error.
pub fn upsert_category(
    input: CategoryInput,
    reserved: &ReservedCategories,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("category name cannot be empty".to_owned()));
    }

    if let Some(parent_id) = input.parent_category {
        let parent = get_category(parent_id, connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCategory(Some(parent_id)),
            error => error,
        })?;

        if parent.parent_category.is_some() {
            return Err(Error::Validation(
                "categories only nest one level deep".to_owned(),
            ));
        }

        if let Some(id) = input.id {
            if has_subcategories(id, connection)? {
                return Err(Error::Validation(
                    "a category with subcategories cannot become a subcategory".to_owned(),
                ));
            }
        }
    }

    match input.id {
        None => {
            connection.execute(
                "INSERT INTO category (name, parent_category, owner) VALUES (?1, ?2, ?3);",
                (name, input.parent_category, input.owner),
            )?;

            let id = connection.last_insert_rowid();

            Ok(Category {
                id,
                name: name.to_owned(),
                parent_category: input.parent_category,
                owner: input.owner,
            })
        }
        Some(id) => {
            if reserved.contains(id) {
                return Err(Error::ReservedCategory);
            }

            let rows_affected = connection.execute(
                "UPDATE category SET name = ?1, parent_category = ?2 WHERE id = ?3 AND owner = ?4;",
                (name, input.parent_category, id, input.owner),
            )?;

            if rows_affected == 0 {
                return Err(Error::UpdateMissingCategory);
            }

            Ok(Category {
                id,
                name: name.to_owned(),
                parent_category: input.parent_category,
                owner: input.owner,
            })
        }
    }
}

/// Retrieve a category by `category_id`.
///
/// # Errors
/// This function will return a [Error::NotFound] if the id refers to no
/// category, or [Error::Sql] if there is some other SQL error.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, parent_category, owner FROM category WHERE id = :id;")?
        .query_one(&[(":id", &category_id)], map_category_row)
        .map_err(|error| error.into())
}

/// Retrieve a page of the categories visible to `owner`: their own plus
/// the reserved system rows.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_categories_by_owner(
    owner: OwnerId,
    page: u64,
    page_size: u64,
    connection: &Connection,
) -> Result<PagedResults<Category>, Error> {
    let total_hit_count: u64 = connection.query_row(
        "SELECT COUNT(id) FROM category WHERE owner = ?1 OR owner = ?2;",
        (owner, SYSTEM_OWNER),
        |row| row.get(0),
    )?;

    let results = connection
        .prepare(
            "SELECT id, name, parent_category, owner FROM category
             WHERE owner = ?1 OR owner = ?2
             ORDER BY name ASC, id ASC
             LIMIT ?3 OFFSET ?4;",
        )?
        .query_map(
            (owner, SYSTEM_OWNER, page_size, page_offset(page, page_size)),
            map_category_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PagedResults::new(results, total_hit_count, page, page_size))
}

/// Retrieve every category visible to `owner`, keyed by id.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_category_map_for_owner(
    owner: OwnerId,
    connection: &Connection,
) -> Result<HashMap<CategoryId, Category>, Error> {
    let categories = connection
        .prepare(
            "SELECT id, name, parent_category, owner FROM category
             WHERE owner = ?1 OR owner = ?2;",
        )?
        .query_map((owner, SYSTEM_OWNER), map_category_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(categories
        .into_iter()
        .map(|category| (category.id, category))
        .collect())
}

/// Retrieve the set of category ids visible to `owner`.
///
/// The rule engine uses this to skip rules whose result category has been
/// deleted.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn get_category_ids(
    owner: OwnerId,
    connection: &Connection,
) -> Result<HashSet<CategoryId>, Error> {
    connection
        .prepare("SELECT id FROM category WHERE owner = ?1 OR owner = ?2;")?
        .query_map((owner, SYSTEM_OWNER), |row| row.get(0))?
        .map(|maybe_id| maybe_id.map_err(|error| error.into()))
        .collect()
}

/// Delete a category, reassigning its transactions to the reserved
/// Uncategorized category. Rules targeting the category are dropped by the
/// foreign key cascade.
///
/// # Errors
/// This function will return a:
/// - [Error::ReservedCategory] if the id refers to a reserved category,
/// - [Error::DeleteMissingCategory] if the id refers to no category,
/// - or [Error::Sql] if there is some other SQL error.
pub fn delete_category(
    category_id: CategoryId,
    reserved: &ReservedCategories,
    connection: &Connection,
) -> Result<(), Error> {
    if reserved.contains(category_id) {
        return Err(Error::ReservedCategory);
    }

    connection.execute(
        "UPDATE \"transaction\" SET category = ?1 WHERE category = ?2;",
        (reserved.uncategorized, category_id),
    )?;

    let rows_affected = connection.execute("DELETE FROM category WHERE id = ?1;", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

fn has_subcategories(category_id: CategoryId, connection: &Connection) -> Result<bool, Error> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM category WHERE parent_category = ?1;",
        [category_id],
        |row| row.get(0),
    )?;

    Ok(count > 0)
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_category: row.get(2)?,
        owner: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{Category, CategoryInput, ReservedCategories},
        db::initialize,
    };

    use super::{delete_category, get_categories_by_owner, get_category, upsert_category};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection, &ReservedCategories::default()).unwrap();
        connection
    }

    fn new_category(name: &str, parent: Option<i64>) -> CategoryInput {
        CategoryInput {
            id: None,
            name: name.to_owned(),
            parent_category: parent,
            owner: 1,
        }
    }

    #[test]
    fn reserved_categories_are_seeded() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();

        let income = get_category(reserved.income, &connection).unwrap();
        let uncategorized = get_category(reserved.uncategorized, &connection).unwrap();
        let unallocated = get_category(reserved.unallocated, &connection).unwrap();

        assert_eq!(income.name, "Income");
        assert_eq!(uncategorized.name, "Uncategorized");
        assert_eq!(unallocated.name, "Unallocated");
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();

        let category =
            upsert_category(new_category("Groceries", None), &reserved, &connection).unwrap();

        assert!(category.id > 0);
        assert_eq!(
            get_category(category.id, &connection).unwrap(),
            Category {
                id: category.id,
                name: "Groceries".to_owned(),
                parent_category: None,
                owner: 1,
            }
        );
    }

    #[test]
    fn create_category_rejects_empty_name() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();

        let result = upsert_category(new_category("  ", None), &reserved, &connection);

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn subcategory_of_subcategory_is_rejected() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();
        let primary =
            upsert_category(new_category("Food", None), &reserved, &connection).unwrap();
        let sub = upsert_category(
            new_category("Restaurants", Some(primary.id)),
            &reserved,
            &connection,
        )
        .unwrap();

        let result = upsert_category(new_category("Sushi", Some(sub.id)), &reserved, &connection);

        assert_eq!(
            result,
            Err(Error::Validation(
                "categories only nest one level deep".to_owned()
            ))
        );
    }

    #[test]
    fn category_with_subcategories_cannot_become_a_subcategory() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();
        let food = upsert_category(new_category("Food", None), &reserved, &connection).unwrap();
        upsert_category(
            new_category("Restaurants", Some(food.id)),
            &reserved,
            &connection,
        )
        .unwrap();
        let travel = upsert_category(new_category("Travel", None), &reserved, &connection).unwrap();

        let result = upsert_category(
            CategoryInput {
                id: Some(food.id),
                name: "Food".to_owned(),
                parent_category: Some(travel.id),
                owner: 1,
            },
            &reserved,
            &connection,
        );

        assert_eq!(
            result,
            Err(Error::Validation(
                "a category with subcategories cannot become a subcategory".to_owned()
            ))
        );
    }

    #[test]
    fn upsert_with_unknown_parent_is_rejected() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();

        let result = upsert_category(new_category("Pets", Some(999)), &reserved, &connection);

        assert_eq!(result, Err(Error::InvalidCategory(Some(999))));
    }

    #[test]
    fn update_category_renames() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();
        let category =
            upsert_category(new_category("Grcoeries", None), &reserved, &connection).unwrap();

        let updated = upsert_category(
            CategoryInput {
                id: Some(category.id),
                name: "Groceries".to_owned(),
                parent_category: None,
                owner: 1,
            },
            &reserved,
            &connection,
        )
        .unwrap();

        assert_eq!(updated.name, "Groceries");
        assert_eq!(get_category(category.id, &connection).unwrap(), updated);
    }

    #[test]
    fn update_missing_category_fails() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();

        let result = upsert_category(
            CategoryInput {
                id: Some(999),
                name: "Ghost".to_owned(),
                parent_category: None,
                owner: 1,
            },
            &reserved,
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingCategory));
    }

    #[test]
    fn reserved_category_cannot_be_updated_or_deleted() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();

        let update_result = upsert_category(
            CategoryInput {
                id: Some(reserved.income),
                name: "Renamed".to_owned(),
                parent_category: None,
                owner: 1,
            },
            &reserved,
            &connection,
        );
        let delete_result = delete_category(reserved.income, &reserved, &connection);

        assert_eq!(update_result, Err(Error::ReservedCategory));
        assert_eq!(delete_result, Err(Error::ReservedCategory));
    }

    #[test]
    fn delete_missing_category_fails() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();

        let result = delete_category(999, &reserved, &connection);

        assert_eq!(result, Err(Error::DeleteMissingCategory));
    }

    #[test]
    fn by_owner_listing_includes_reserved_rows() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();
        upsert_category(new_category("Groceries", None), &reserved, &connection).unwrap();

        let page = get_categories_by_owner(1, 1, 50, &connection).unwrap();

        assert_eq!(page.total_hit_count, 4);
        assert!(page.results.iter().any(|category| category.name == "Income"));
        assert!(
            page.results
                .iter()
                .any(|category| category.name == "Groceries")
        );
    }

    #[test]
    fn by_owner_listing_pages() {
        let connection = get_test_connection();
        let reserved = ReservedCategories::default();
        for name in ["A", "B", "C", "D", "E"] {
            upsert_category(new_category(name, None), &reserved, &connection).unwrap();
        }

        let first = get_categories_by_owner(1, 1, 3, &connection).unwrap();
        let last = get_categories_by_owner(1, 3, 3, &connection).unwrap();

        // 5 owned + 3 reserved rows.
        assert_eq!(first.total_hit_count, 8);
        assert_eq!(first.hit_count, 3);
        assert!(first.has_next);
        assert!(!first.has_prev);
        assert_eq!(last.hit_count, 2);
        assert!(!last.has_next);
    }
}
