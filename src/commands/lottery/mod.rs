pub mod handlers;
pub mod manager;
pub mod models;
pub mod scheduler;
pub mod storage;

pub use crate::commands::lottery::handlers::lottery;
