//! Library exports for the bookmarking service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod database;
pub mod error;
pub mod handler;
pub mod identity;
pub mod link;
pub mod middleware;
pub mod model;
pub mod preview;
pub mod query;
pub mod route;
pub mod store;
