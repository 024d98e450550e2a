//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own parsing, validation, and persistence so route handlers
//! stay focused on request/response translation.

pub mod builder;
pub mod links;
pub mod memo;
pub mod share;
