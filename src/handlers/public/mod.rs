// handlers/public/mod.rs - Handlers that do not require a token
//
// Token acquisition (/signup, /login) and the /ping health check.

pub mod auth;
pub mod ping;

pub use auth::*;
pub use ping::ping_get;
