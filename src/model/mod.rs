pub mod config;
pub mod entry;
pub mod path;
pub mod saved_search;
pub mod tag;
pub mod value;

pub use config::*;
pub use entry::*;
pub use path::*;
pub use saved_search::*;
pub use tag::*;
pub use value::*;
