pub mod collector;
pub mod user_service;

pub use collector::DataCollector;
pub use user_service::{UserRecord, UserService, UserStoreError};
