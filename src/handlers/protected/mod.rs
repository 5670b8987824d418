// handlers/protected/mod.rs - Handlers behind jwt_auth_middleware
//
// Each handler can read the caller from the `AuthUser` request extension.

pub mod data;

pub use data::*;
