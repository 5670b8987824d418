pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod middleware;
pub mod redaction;
pub mod server;
pub mod services;
pub mod storage;
pub mod testing;
