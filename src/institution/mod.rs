//! Financial institution management.
//!
//! Institutions anchor statement imports: a statement file names its
//! bank id, and accounts are only unique within one institution.

mod core;
mod endpoints;

pub use core::{
    Institution, InstitutionInput, create_institution_table, delete_institution,
    find_institution_by_fit_id, get_institution, get_institutions, upsert_institution,
};
pub use endpoints::{
    InstitutionState, delete_institution_endpoint, get_institution_endpoint,
    get_institutions_endpoint, upsert_institution_endpoint,
};
