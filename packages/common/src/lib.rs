pub mod category;
pub mod role;
pub mod storage;

pub use category::FileCategory;
pub use role::Role;
