// Plurality tabulation: the highest tally wins, ties go to the candidate
// registered first.

use serde::{Deserialize, Serialize};

/// A candidate's name and tally, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    pub name: String,
    pub votes: u64,
}

impl TallyEntry {
    pub fn new(name: &str, votes: u64) -> Self {
        Self {
            name: name.to_string(),
            votes,
        }
    }
}

/// Outcome of a winner computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Winner {
    NoCandidates,
    /// Every tally is zero.
    NotStarted,
    Decided {
        name: String,
        votes: u64,
        /// Lead over the next lower tally; 0 when nothing lower exists.
        margin: u64,
        /// Other candidates holding the winning tally, in registration order.
        tied_with: Vec<String>,
    },
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Winner::NoCandidates => write!(f, "No candidates available."),
            Winner::NotStarted => write!(f, "Voting has not yet started."),
            Winner::Decided {
                name,
                votes,
                margin,
                tied_with,
            } => {
                write!(f, "Winner: {}\nVotes: {}\nVote Difference: {}", name, votes, margin)?;
                if !tied_with.is_empty() {
                    write!(f, "\nTied with: {}", tied_with.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Pick the winner of `tallies`, given in registration order.
pub fn decide_winner(tallies: &[TallyEntry]) -> Winner {
    if tallies.is_empty() {
        return Winner::NoCandidates;
    }
    if tallies.iter().all(|entry| entry.votes == 0) {
        return Winner::NotStarted;
    }

    // sort_by is stable, so equal tallies keep registration order
    let mut ranked: Vec<&TallyEntry> = tallies.iter().collect();
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes));

    let leader = ranked[0];
    let tied_with = ranked[1..]
        .iter()
        .take_while(|entry| entry.votes == leader.votes)
        .map(|entry| entry.name.clone())
        .collect::<Vec<_>>();
    let runner_up = ranked[1 + tied_with.len()..].first().map(|entry| entry.votes);

    Winner::Decided {
        name: leader.name.clone(),
        votes: leader.votes,
        margin: runner_up.map(|votes| leader.votes - votes).unwrap_or(0),
        tied_with,
    }
}

pub fn total_votes(tallies: &[TallyEntry]) -> u64 {
    tallies.iter().map(|entry| entry.votes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tallies(entries: &[(&str, u64)]) -> Vec<TallyEntry> {
        entries
            .iter()
            .map(|(name, votes)| TallyEntry::new(name, *votes))
            .collect()
    }

    #[test]
    fn empty_field_has_no_candidates() {
        assert_eq!(decide_winner(&[]), Winner::NoCandidates);
    }

    #[test]
    fn all_zero_is_not_started() {
        assert_eq!(decide_winner(&tallies(&[("A", 0), ("B", 0)])), Winner::NotStarted);
    }

    #[test]
    fn tie_goes_to_first_registered() {
        let winner = decide_winner(&tallies(&[("A", 5), ("B", 3), ("C", 5)]));
        assert_eq!(
            winner,
            Winner::Decided {
                name: "A".to_string(),
                votes: 5,
                margin: 2,
                tied_with: vec!["C".to_string()],
            }
        );
    }

    #[test]
    fn single_candidate_has_zero_margin() {
        let winner = decide_winner(&tallies(&[("A", 4)]));
        assert!(matches!(winner, Winner::Decided { margin: 0, votes: 4, .. }));
    }

    #[test]
    fn margin_is_lead_over_runner_up() {
        let winner = decide_winner(&tallies(&[("A", 1), ("B", 7), ("C", 4)]));
        match winner {
            Winner::Decided {
                name,
                margin,
                tied_with,
                ..
            } => {
                assert_eq!(name, "B");
                assert_eq!(margin, 3);
                assert!(tied_with.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn full_tie_has_zero_margin() {
        let winner = decide_winner(&tallies(&[("A", 2), ("B", 2)]));
        assert!(matches!(winner, Winner::Decided { ref name, margin: 0, .. } if name == "A"));
    }

    #[test]
    fn display_matches_result_dialog() {
        let winner = decide_winner(&tallies(&[("X", 1), ("Y", 0)]));
        assert_eq!(winner.to_string(), "Winner: X\nVotes: 1\nVote Difference: 1");
    }
}
