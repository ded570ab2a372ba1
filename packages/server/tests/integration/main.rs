mod admin;
mod auth;
mod files;
mod profile;
mod storage;
