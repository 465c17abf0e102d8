pub mod config;
pub mod error;

pub use config::TroveConfig;
pub use error::{Result, TroveError};
