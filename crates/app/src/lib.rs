//! Storefront application services, persistence and collaborators.

pub mod activity;
pub mod auth;
pub mod clock;
pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod pagination;
pub mod store;

#[cfg(test)]
mod test;
