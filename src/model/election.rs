use serde::{Deserialize, Serialize};

pub const DEFAULT_MANIFESTO: &str = "No manifesto provided.";

/// A registered candidate and its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub place: String,
    pub id: String,
    pub party: String,
    pub symbol: String,
    pub assets: String,
    pub criminal_cases: String,
    pub manifesto: String,
    pub votes: u64,
}

impl Candidate {
    pub fn new(
        name: &str,
        place: &str,
        id: &str,
        party: &str,
        symbol: &str,
        assets: &str,
        criminal_cases: &str,
    ) -> Candidate {
        Candidate {
            name: name.to_string(),
            place: place.to_string(),
            id: id.to_string(),
            party: party.to_string(),
            symbol: symbol.to_string(),
            assets: assets.to_string(),
            criminal_cases: criminal_cases.to_string(),
            manifesto: DEFAULT_MANIFESTO.to_string(),
            votes: 0,
        }
    }

    pub fn matches(&self, name: &str, id: &str) -> bool {
        self.name == name && self.id == id
    }

    /// One-line `name | party | symbol` summary used by ballot listings.
    pub fn summary(&self) -> String {
        format!("{} | {} | {}", self.name, self.party, self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub name: String,
    pub id: String,
    pub has_voted: bool,
}

impl Voter {
    pub fn new(name: &str, id: &str) -> Voter {
        Voter {
            name: name.to_string(),
            id: id.to_string(),
            has_voted: false,
        }
    }

    pub fn matches(&self, name: &str, id: &str) -> bool {
        self.name == name && self.id == id
    }
}

/// Identifies a voter by the `(name, id)` pair they log in with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoterRef {
    pub name: String,
    pub id: String,
}

impl VoterRef {
    pub fn new(name: &str, id: &str) -> VoterRef {
        VoterRef {
            name: name.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for VoterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (ID: {})", self.name, self.id)
    }
}

impl From<&Voter> for VoterRef {
    fn from(voter: &Voter) -> Self {
        VoterRef::new(&voter.name, &voter.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// The deadline timer fired.
    Deadline,
    /// `end()` was called before the deadline.
    Manual,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::Deadline => write!(f, "deadline"),
            EndReason::Manual => write!(f, "manual"),
        }
    }
}
