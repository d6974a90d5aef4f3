use super::CommandResult;
use colored::*;
use election_sim::database::RecordStore;
use election_sim::election::ElectionConfig;
use election_sim::reports::{ElectionReport, Winner};
use election_sim::Session;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateView {
    Names,
    Summary,
    Details,
    Manifestos,
}

pub async fn candidates(store: Arc<dyn RecordStore>, view: CandidateView) -> CommandResult {
    let session = Session::open(store, ElectionConfig::default()).await;

    println!("{}", "👥 Registered Candidates".bright_cyan().bold());
    let lines = match view {
        CandidateView::Names => session.candidate_list().await,
        CandidateView::Summary => session.candidate_summary().await,
        CandidateView::Details => session.candidate_details().await,
        CandidateView::Manifestos => session
            .candidate_manifestos()
            .await
            .into_iter()
            .map(|(name, manifesto)| format!("{}:\n{}\n", name.bright_white().bold(), manifesto))
            .collect(),
    };

    if lines.is_empty() {
        println!("{}", "No candidates registered".yellow());
    }
    for line in lines {
        println!("{}", line);
    }

    Ok(())
}

pub async fn voters(store: Arc<dyn RecordStore>) -> CommandResult {
    let session = Session::open(store, ElectionConfig::default()).await;

    println!("{}", "🗳️  Registered Voters".bright_cyan().bold());
    let voters = session.voter_list().await;
    if voters.is_empty() {
        println!("{}", "No voters registered".yellow());
    }
    for voter in voters {
        println!("{}", voter);
    }

    Ok(())
}

/// Print stored tallies and the winner they imply.
pub async fn results(store: Arc<dyn RecordStore>, json: bool) -> CommandResult {
    let session = Session::open(store, ElectionConfig::default()).await;
    let report = session.report().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

pub fn print_report(report: &ElectionReport) {
    println!("\n{}", "🏆 Election Results".bright_cyan().bold());
    println!("{}", "=".repeat(50).bright_cyan());

    for entry in &report.breakdown {
        println!(
            "{} : {} votes",
            entry.name.bright_white(),
            entry.votes.to_string().bright_yellow()
        );
    }

    println!("{}", "-".repeat(50).bright_cyan());
    println!(
        "{}: {} ({} of {} voters)",
        "Total Votes".bright_white().bold(),
        report.total_votes.to_string().bright_green().bold(),
        report.voters_turned_out,
        report.registered_voters
    );
    print_winner(&report.winner);
}

pub fn print_winner(winner: &Winner) {
    match winner {
        Winner::Decided { .. } => println!("{}", winner.to_string().bright_green().bold()),
        _ => println!("{}", winner.to_string().yellow()),
    }
}
