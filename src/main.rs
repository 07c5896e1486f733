use clap::Parser;
use tracing_subscriber::EnvFilter;

use kmersieve::cli::Args;
use kmersieve::error::SieveError;

fn main() {
    let args = Args::parse();

    let default_filter = if args.quiet { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let config = args.to_config();
    match kmersieve::run::run(&config) {
        Ok(summary) => {
            tracing::info!(
                solid_kmers = summary.solid_kmers,
                passes = summary.plan.passes,
                partitions = summary.plan.partitions,
                "done"
            );
        }
        Err(err @ SieveError::Cancelled) => {
            eprintln!("kmersieve: {err}");
            std::process::exit(130);
        }
        Err(err) => {
            eprintln!("kmersieve: {err}");
            std::process::exit(1);
        }
    }
}
