//! Request middleware.
//!
//! Purpose: request lifecycle concerns shared by every route. Route-scoped
//! middleware such as the credit guard lives with the HTTP adapter.

pub mod trace;

pub use trace::Trace;
