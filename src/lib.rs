/// Haven accounts
///
/// User accounts for a rental-property platform: registration, role-based
/// access control, profile images and a JWT session lifecycle with
/// refresh-token blacklisting.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod image_store;
pub mod jobs;
pub mod policy;
pub mod server;
pub mod service;
pub mod session;
