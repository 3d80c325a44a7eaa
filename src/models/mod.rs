pub mod file;
pub mod user;

pub use file::{file_kind, FileKind, FileRow};
pub use user::{UserRow, PLACEHOLDER_AVATAR};
