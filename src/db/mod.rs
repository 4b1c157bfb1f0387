pub mod postgres;
pub mod query;
pub mod redis;

pub use postgres::{ConnectionState, Database, PoolSettings, TlsPolicy};
pub use query::{QueryResult, SqlParam};
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
