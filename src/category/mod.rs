//! Category management for the finance tracker.
//!
//! Categories label transactions and budgets, and form a two-level tree:
//! primary categories and their subcategories. This module contains:
//! - The `Category` model, its database functions and tree invariants
//! - Assembly of flat rows into primary/subcategory groups
//! - Route handlers for the category endpoints

mod core;
mod endpoints;
mod tree;

pub use core::{
    Category, CategoryInput, ReservedCategories, SYSTEM_OWNER, create_category_table,
    delete_category, get_categories_by_owner, get_category, get_category_ids,
    get_category_map_for_owner, seed_reserved_categories, upsert_category,
};
pub use endpoints::{
    CategoryState, delete_category_endpoint, get_categories_by_owner_endpoint,
    get_category_endpoint, get_primary_categories_endpoint, upsert_category_endpoint,
};
pub use tree::{PrimaryCategory, assemble_primary_categories};
