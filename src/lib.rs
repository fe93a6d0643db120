//! Patient Records Service
//!
//! Headless backend for a patient registry: typed record model, repository
//! facade over a pluggable document store, medical-timeline merging, and a
//! Gemini-backed summary/chat client, exposed over a JSON HTTP API.

pub mod ai;
pub mod api;
pub mod config;
pub mod records;
pub mod repository;
pub mod store;
pub mod timeline;

pub use config::Config;
pub use repository::PatientRepository;
