use super::{validate_field, CommandResult};
use colored::Colorize;
use election_sim::database::RecordStore;
use election_sim::election::ElectionConfig;
use election_sim::model::election::{Candidate, Voter};
use election_sim::Session;
use std::sync::Arc;

pub struct CandidateForm {
    pub name: String,
    pub place: String,
    pub id: String,
    pub party: String,
    pub symbol: String,
    pub assets: String,
    pub criminal_cases: String,
}

impl CandidateForm {
    pub fn validate(&self) -> election_sim::Result<Candidate> {
        validate_field("name", &self.name)?;
        validate_field("place", &self.place)?;
        validate_field("id", &self.id)?;
        validate_field("party", &self.party)?;
        validate_field("symbol", &self.symbol)?;
        validate_field("assets", &self.assets)?;
        validate_field("criminal cases", &self.criminal_cases)?;

        Ok(Candidate::new(
            self.name.trim(),
            self.place.trim(),
            self.id.trim(),
            self.party.trim(),
            self.symbol.trim(),
            self.assets.trim(),
            self.criminal_cases.trim(),
        ))
    }
}

pub fn voter_from_input(name: &str, id: &str) -> election_sim::Result<Voter> {
    validate_field("name", name)?;
    validate_field("id", id)?;
    Ok(Voter::new(name.trim(), id.trim()))
}

pub async fn register_candidate(store: Arc<dyn RecordStore>, form: CandidateForm) -> CommandResult {
    let candidate = form.validate()?;
    let session = Session::open(store, ElectionConfig::default()).await;

    println!("👤 Registering candidate {}", candidate.name.bright_cyan());
    session.register_candidate(candidate).await?;
    println!("✅ Candidate registered successfully!");

    Ok(())
}

pub async fn register_voter(store: Arc<dyn RecordStore>, name: &str, id: &str) -> CommandResult {
    let voter = voter_from_input(name, id)?;
    let session = Session::open(store, ElectionConfig::default()).await;

    println!("🗳️  Registering voter {}", voter.name.bright_cyan());
    session.register_voter(voter).await?;
    println!("✅ Voter registered successfully!");

    Ok(())
}
