//! medley-ums — University management REST API.
//! Provides:
//!   - Departments, students, faculty, courses and notices as generic
//!     paginated, searchable CRUD resources
//!   - Reference population and referential integrity between them
//!   - Dashboard aggregates
//!   - Accounts and bearer sessions guarding the resource routes
//!   - The hardening stack the service runs behind: per-client rate limit,
//!     CORS for the frontend origin, security headers and a body limit

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod resource;
pub mod router;
pub mod seed;

pub use auth::{SharedAuth, UmsAuth};
pub use db::{Collection, SharedDb, UmsDb};
pub use error::UmsError;
pub use resource::Resource;
pub use router::{build_router, not_found};
