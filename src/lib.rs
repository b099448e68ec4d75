pub mod arm;
pub mod clustering;
pub mod config;
pub mod error;
pub mod frame_source;
pub mod io;
pub mod pipeline;
pub mod projector;
pub mod segmentation;
pub mod synthetic;
pub mod tracker;
pub mod types;

pub use error::{Error, Result};

/// Initializes `env_logger` once per process.
///
/// Only warnings are shown unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}
