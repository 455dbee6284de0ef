//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub(crate) mod context;
pub mod credit_guard;
pub mod credits;
pub mod error;
pub mod health;
pub mod pantries;
pub mod recipes;
pub mod shopping_lists;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
