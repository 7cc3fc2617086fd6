//! HTTP handlers for the pets API.

pub mod pets;
pub use pets::*;
