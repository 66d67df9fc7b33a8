pub mod change;
pub mod config;
pub mod error;
pub mod layout;
pub mod source;

pub use change::*;
pub use config::ExportConfig;
pub use error::*;
pub use source::*;
