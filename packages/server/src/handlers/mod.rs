pub mod admin;
pub mod auth;
pub mod files;
pub mod notes;
pub mod profile;
pub mod storage;
