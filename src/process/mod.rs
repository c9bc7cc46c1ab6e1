// src/process/mod.rs
pub mod coerce;
pub mod convert;
pub mod date_parser;
pub mod diagnostics;
pub mod extract;
pub mod flatten;
pub mod overview;
pub mod selector;
pub mod table;
pub mod utils;

pub use coerce::coerce;
pub use diagnostics::{Diagnostic, Issue, Normalized};
pub use extract::{extract_subtrees, extract_table, TableSpec};
pub use flatten::flatten;
pub use overview::{clean_user_overview, overview_table_specs, UserOverview};
pub use selector::Selector;
pub use table::{Cell, Table};
