pub mod config_io;

pub use config_io::{ConfigError, load_config, read_config, write_config};
