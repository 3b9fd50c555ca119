//! Application services: cape resolution, content delivery and cache administration.

pub mod capes;
pub mod content;
pub mod descriptor;
pub mod error;
pub mod hashing;
pub mod invalidation;
pub mod repos;
mod upstream;
