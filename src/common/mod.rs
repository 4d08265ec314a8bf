//! Shared types, errors and collaborator interfaces

pub mod access;
pub mod clock;
pub mod errors;
pub mod ledger;
pub mod oracle;
pub mod traits;
pub mod types;
