//! Token models shared by the store, the flows, and the gateway.

pub mod credential;
pub mod grant;
pub mod secret;
