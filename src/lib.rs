pub mod common;
pub mod config;
pub mod error;
pub mod network;
pub mod room;
pub mod storage;
pub mod ui;

pub use error::{ChatError, Result};
