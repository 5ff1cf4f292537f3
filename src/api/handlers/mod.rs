//! Route handlers for the session endpoints, guarded pages and health.

pub mod health;
pub mod logout;
pub mod pages;
pub mod root;
pub mod session;
