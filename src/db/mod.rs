mod article;
pub mod core;
mod schema;

pub use self::article::UpsertOutcome;
pub use self::core::Database;
pub use self::core::DbLockErrorExt;
