//! HTTP dispatch adapter mapping verbs on a single resource route to
//! CRUD operations on a pluggable backend, with HAL responses and
//! problem+json errors.
pub mod api;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod middleware;
pub mod repos;
pub mod services;
pub mod state;
