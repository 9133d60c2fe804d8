//! licensedesk - a small JSON endpoint for license requests.
//!
//! A person (identified by a national id) asks for a license (identified by
//! a license id); the request is stored as `pending`. An operator later
//! approves or rejects it. Approval stamps an expiration computed from the
//! license's validity period.
//!
//! # Features
//!
//! - `server` - Server components (handlers, database). Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `mysql` - MySQL database backend.
//!
//! # Example
//!
//! ```toml
//! # Use defaults (server + sqlite)
//! licensedesk = { path = "." }
//!
//! # Domain types only (status and validity arithmetic)
//! licensedesk = { path = ".", default-features = false }
//!
//! # Server with MySQL
//! licensedesk = { path = ".", features = ["server", "mysql"] }
//! ```

// Core modules (always available)
pub mod config;
pub mod errors;
pub mod status;
pub mod validity;

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;
