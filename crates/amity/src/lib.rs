pub mod api;
pub mod config;
mod db;
mod error;
pub mod ids;
pub mod manager;
pub mod migration;
pub mod store;
pub mod time;

pub use api::*;
pub use config::{AmityConfig, DatabaseConfig, PoolConfig};
pub use error::{AmityError, AmityResult};
pub use ids::{Id, UserId};
pub use manager::MatchManager;
pub use store::AmityStore;
pub use time::Timestamp;
