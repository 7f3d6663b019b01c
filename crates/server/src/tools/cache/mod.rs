//! Cache inspection tools.

pub mod generations;
pub mod get;

pub use generations::generations_impl;
pub use get::{CacheGetParams, get_impl};
