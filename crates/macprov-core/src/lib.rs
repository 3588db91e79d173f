pub mod config;
pub mod error;
pub mod logging;
pub mod params;
pub mod types;

pub use error::{MacError, MacResult};
pub use types::{LogFormat, ResolutionMode};
