// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) and Protected (Bearer JWT). The router in `server` applies
// `jwt_auth_middleware` to every protected route.

pub mod protected;
pub mod public;

pub use protected::*;
pub use public::*;
