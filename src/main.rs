//! Command line interface of decovar.

use clap::{Parser, Subcommand};

use decovar::{allele, common};

#[derive(Debug, Parser)]
#[command(author, version, about = "deCODE variant tools")]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Reshape the alleles of multi-allelic records.
    Allele(allele::Args),
}

fn main() {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let res = tracing::subscriber::with_default(collector, || match &cli.command {
        Commands::Allele(args) => allele::run(&cli.common, args),
    });

    if let Err(err) = res {
        eprintln!("[decovar error] {:#}", err);
        std::process::exit(1);
    }
}
