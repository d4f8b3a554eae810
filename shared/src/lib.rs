pub mod password;
pub mod store;
mod types;

pub use store::{MemoryUserStore, SqliteUserStore, StoreError, UserStore};
pub use types::*;
