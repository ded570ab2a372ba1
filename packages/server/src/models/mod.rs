pub mod admin;
pub mod auth;
pub mod file;
pub mod note;
pub mod profile;
pub mod shared;
pub mod storage;
