pub mod types;
pub mod error;
pub mod analytics;
pub mod config;
pub mod data;
pub mod service;
pub mod store;
pub mod time;
pub mod utils;

pub use types::*;
pub use error::{PriceError, Result};
pub use service::PriceService;
