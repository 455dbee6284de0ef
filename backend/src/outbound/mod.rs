//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **llm**: reqwest-backed language model vendors
//! - **memory**: in-process repositories and a scripted provider
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod llm;
pub mod memory;
pub mod persistence;
