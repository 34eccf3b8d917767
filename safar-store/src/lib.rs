pub mod app_config;
pub mod memory;
pub mod postgres;
pub mod redis_repo;

pub use app_config::Config;
pub use memory::MemoryStore;
pub use postgres::{PgDirectory, PgStore};
pub use redis_repo::RedisClient;
