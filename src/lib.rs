pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{AppError, AppResult};
