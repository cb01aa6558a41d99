//! # melange-accounts
//!
//! Local user accounts: registration with validated input and Argon2id
//! password hashes, and password login.

#![warn(clippy::all)]

pub mod errors;
pub mod service;
pub mod traits;
pub mod types;
pub mod validation;

pub use errors::{AccountError, Result};
pub use service::AccountService;
pub use traits::Accounts;
pub use types::*;
