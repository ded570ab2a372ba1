pub mod file_upload;
pub mod magic_link;
pub mod note;
pub mod profile;
pub mod session;
pub mod user;
pub mod user_role;
