#![allow(dead_code)]

use tansu_wire::{Error, Result};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{EnvFilter, filter::Directive};

pub(crate) fn init_tracing() -> Result<DefaultGuard> {
    format!("{}=debug", env!("CARGO_PKG_NAME").replace("-", "_"))
        .parse::<Directive>()
        .map_err(|error| Error::Message(error.to_string()))
        .map(|directive| {
            tracing::subscriber::set_default(
                tracing_subscriber::fmt()
                    .with_level(true)
                    .with_line_number(true)
                    .with_thread_names(false)
                    .with_target(true)
                    .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
                    .with_test_writer()
                    .finish(),
            )
        })
}
