//! Shared helpers.

mod dot;

pub use dot::{escape_dot, DotWriter};
