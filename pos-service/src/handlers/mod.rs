//! HTTP handlers for the POS backend.

pub mod auth;
pub mod product;
pub mod role;
pub mod sale;
pub mod tenant;
pub mod user;
