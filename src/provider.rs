//! Provider-facing descriptors: endpoint URLs, client authentication, and grant labels.
//!
//! A [`ProviderDescriptor`] is validated once by its builder and then shared by every flow, so
//! the flows never parse or check endpoint URLs themselves.

pub mod descriptor;

pub use descriptor::*;
