pub mod batch;
pub mod classify;
pub mod client;
pub mod credentials;
pub mod endpoints;
pub mod registry;
