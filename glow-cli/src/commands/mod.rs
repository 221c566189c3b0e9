//! Subcommand implementations.

pub mod certify;
pub mod decrypt;
pub mod extract;
pub mod series;
pub mod topic;
pub mod verify;
