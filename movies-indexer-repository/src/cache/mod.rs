//! Redis implementation of the cache provider.

mod redis;

pub use redis::{RedisCache, RedisConfig};
