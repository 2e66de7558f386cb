//! Cache backend implementations

pub mod array;
pub mod chained;
pub mod file;
pub mod null;
#[cfg(feature = "process-cache")]
pub mod process;
#[cfg(feature = "redis")]
pub mod redis_cache;

pub use array::ArrayCache;
pub use chained::ChainedCache;
pub use file::FileCache;
pub use null::NullCache;
#[cfg(feature = "process-cache")]
pub use process::ProcessCache;
#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;
