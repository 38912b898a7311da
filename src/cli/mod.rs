//! CLI command handlers.
//!
//! Each handler implements one subcommand, takes plain arguments from
//! main.rs and returns the process exit code. I/O and metadata stamping
//! go through [`crate::io`].

mod amend;
mod build_public;
mod merge;
mod set;
mod validate;

pub use amend::run_amend;
pub use build_public::run_build_public;
pub use merge::{run_merge, run_merge_vex};
pub use set::{run_set, SetOptions};
pub use validate::run_validate;
