pub mod config;
pub mod datagen_toml;
pub mod logger;
pub mod worker_rng;

pub use config::*;
pub use datagen_toml::{
    DatagenToml, apply_file_to_config, load_datagen_toml, load_datagen_toml_from,
    parse_datagen_toml,
};
pub use logger::setup_logging;
pub use worker_rng::{
    current_worker_id, init_worker, with_worker_rng, worker_gen_bool, worker_gen_range,
};
