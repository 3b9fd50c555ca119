//! Cape identifier resolution and cache-aside asset delivery.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
