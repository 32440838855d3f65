pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod images;
pub mod models;
pub mod normalizer;
pub mod service;
pub mod transport;

pub use crate::config::Config;
pub use crate::error::{GiftAdvisorError, Result};
pub use crate::models::GiftRecord;
pub use crate::service::{GiftAdvisor, Recommendations};
