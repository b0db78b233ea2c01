pub mod config;
pub mod error;
pub mod mapping;
pub mod reader;
pub mod table;
pub mod types;

pub use config::*;
pub use error::*;
pub use mapping::*;
pub use reader::*;
pub use table::*;
pub use types::*;
