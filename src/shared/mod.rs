pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod traits;

pub use error::*;
pub use traits::*;
