//! Text cleaning and topic modeling for social-media and news corpora

pub mod cleaning;
pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod topics;

pub use config::Config;
pub use error::{MediaTopicsError, Result};
pub use source::DataSource;
