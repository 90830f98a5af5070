pub mod core;
pub mod marks;
pub mod marksheets;
pub mod reports;
pub mod setup;
pub mod students;
