pub mod moka;
pub mod null;
pub mod redis;

pub use self::moka::MokaCacheWrapper;
pub use self::null::NullObjectCache;
pub use self::redis::RedisObjectCache;
