//! Authentication for the HTTP surface: JWT validation plus a
//! pluggable session cache keyed by the raw bearer token.

pub mod cache;
pub mod claims;
#[cfg(feature = "redis")]
pub mod redis_cache;

pub use cache::{InMemoryTokenCache, TokenCache, DEFAULT_SESSION_TTL_SECS};
pub use claims::{Hs256TokenValidator, JwtClaims, TokenValidationError, TokenValidator};
#[cfg(feature = "redis")]
pub use redis_cache::{RedisCacheError, RedisTokenCache};
