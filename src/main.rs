mod commands;

use crate::commands::{open_store, Backend, CandidateForm, CandidateView, CommandResult};
use clap::{Parser, Subcommand};
use colored::*;
use election_sim::election::{parse_duration, ElectionConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "election-sim", about = "Run a time-boxed election simulation")]
struct Opts {
    /// Directory holding the election records
    #[clap(long, default_value = ".")]
    data_dir: PathBuf,

    /// Record store backend
    #[clap(long, value_enum, default_value = "flat-file")]
    backend: Backend,

    /// Log filter ("info", "debug", "election_sim=trace", ...); RUST_LOG wins when set
    #[clap(long, default_value = "warn")]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a candidate, or update the one with the same id.
    RegisterCandidate {
        #[clap(long)]
        name: String,
        #[clap(long)]
        place: String,
        #[clap(long)]
        id: String,
        #[clap(long)]
        party: String,
        #[clap(long)]
        symbol: String,
        #[clap(long)]
        assets: String,
        /// Pending criminal cases, as declared
        #[clap(long, default_value = "0")]
        criminal_cases: String,
    },
    /// Register a voter.
    RegisterVoter {
        #[clap(long)]
        name: String,
        #[clap(long)]
        id: String,
    },
    /// List candidates.
    Candidates {
        /// One "name | party | symbol" line per candidate
        #[clap(long)]
        summary: bool,
        /// Place, party, assets and criminal cases
        #[clap(long, conflicts_with = "summary")]
        details: bool,
        /// Each candidate's manifesto
        #[clap(long, conflicts_with_all = &["summary", "details"])]
        manifestos: bool,
    },
    /// List voters.
    Voters,
    /// Print stored tallies and the winner.
    Results {
        /// Emit JSON instead of text
        #[clap(long)]
        json: bool,
    },
    /// Run an election, reading commands from stdin.
    Run {
        /// Voting window in seconds
        #[clap(long)]
        duration: String,
        /// Seconds between live tally snapshots
        #[clap(long, default_value = "5")]
        tally_interval: u64,
    },
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&opts.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = dispatch(opts).await {
        eprintln!("{} {}", "❌ Command failed:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn dispatch(opts: Opts) -> CommandResult {
    // Validate the duration before touching the store
    if let Command::Run { duration, .. } = &opts.command {
        parse_duration(duration)?;
    }

    let store = open_store(opts.backend, &opts.data_dir).await?;

    match opts.command {
        Command::RegisterCandidate {
            name,
            place,
            id,
            party,
            symbol,
            assets,
            criminal_cases,
        } => {
            commands::register_candidate(
                store,
                CandidateForm {
                    name,
                    place,
                    id,
                    party,
                    symbol,
                    assets,
                    criminal_cases,
                },
            )
            .await
        }
        Command::RegisterVoter { name, id } => commands::register_voter(store, &name, &id).await,
        Command::Candidates {
            summary,
            details,
            manifestos,
        } => {
            let view = if summary {
                CandidateView::Summary
            } else if details {
                CandidateView::Details
            } else if manifestos {
                CandidateView::Manifestos
            } else {
                CandidateView::Names
            };
            commands::candidates(store, view).await
        }
        Command::Voters => commands::voters(store).await,
        Command::Results { json } => commands::results(store, json).await,
        Command::Run {
            duration,
            tally_interval,
        } => {
            let config = ElectionConfig {
                tally_interval: Duration::from_secs(tally_interval.max(1)),
                ..ElectionConfig::default()
            };
            commands::run(store, parse_duration(&duration)?, config).await
        }
    }
}
