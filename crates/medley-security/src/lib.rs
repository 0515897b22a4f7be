//! medley-security — Password hashing, session tokens, request rate limiting
//! and hardening headers shared by the Medley services.

pub mod headers;
pub mod password;
pub mod rate_limit;
pub mod token;

pub use headers::with_security_headers;
pub use password::{PasswordHasher, SecurityError};
pub use rate_limit::{client_key, RateDecision, RateLimiter};
pub use token::new_session_token;
