//! Configuration schema and loading for parrot.
//!
//! Config is discovered from `parrot.{toml,yaml,yml,json}` in the working
//! directory, then the user config dir. The registration flow writes the
//! server URL and access token back through [`persist_credentials`].

pub mod loader;
pub mod schema;

pub use {
    loader::{
        config_dir, data_dir, discover_and_load, find_or_default_config_path, load_config,
        persist_credentials, save_config,
    },
    schema::ParrotConfig,
};
