//! medley-common — Identifiers, timestamps and lock helpers shared across
//! the Medley crates.

pub mod ids;
pub mod sync;

pub use ids::{new_id, now, short_id};
