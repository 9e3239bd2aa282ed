pub mod chain;
pub mod cli;
pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod storage;
pub mod sweep;
pub mod utils;

pub use config::Config;
pub use error::{Result, WatchError};
