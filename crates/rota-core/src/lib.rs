//! Core types, validation and services for the Rota restaurant directory.
//!
//! This crate has no HTTP or database dependencies. Storage
//! backends implement [`store::DocumentStore`]; the HTTP layer calls into the
//! services defined here and only ever hands them already-typed payloads.

pub mod address;
pub mod client;
pub mod error;
pub mod identity;
pub mod mutation;
pub mod patch;
pub mod profile;
pub mod query;
pub mod restaurant;
pub mod store;
pub mod validate;

pub use error::{Error, Result};
