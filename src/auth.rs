//! Credential state, issued grants, and redacted token secrets.

pub mod token;

pub use token::{credential::*, grant::*, secret::*};
