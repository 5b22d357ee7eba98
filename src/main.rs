use anyhow::Result;
use blockmap_core::cli::Args;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    blockmap_core::run_cli(&args)
}
