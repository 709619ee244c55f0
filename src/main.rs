use crate::cli::run;

pub mod cli;
mod config;
mod context;
pub mod domain;
pub mod error;
pub mod http;
pub mod playback;
pub mod upstream;

fn main() -> anyhow::Result<()> {
    run()
}
