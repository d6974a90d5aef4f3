use super::listing::{print_report, print_winner};
use super::register::{voter_from_input, CandidateForm};
use super::{validate_field, CommandResult};
use colored::*;
use election_sim::campaign::CampaignChange;
use election_sim::database::RecordStore;
use election_sim::election::{parse_duration, ElectionConfig, ElectionPhase, Ending};
use election_sim::model::election::VoterRef;
use election_sim::session::VoterStatus;
use election_sim::{ElectionError, Session};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands (arguments separated by '|'):
  vote <name> | <id> | <candidate>      cast a vote
  login <name> | <id>                   check a voter's status
  start <seconds>                       start a new election after the last one ended
  end                                   end the election now
  total                                 live vote total
  breakdown | winner                    final results (after the election ends)
  snapshot                              latest live tally snapshot
  status                                election phase and time left
  campaign start | campaign end         open or close manifesto editing
  manifesto <name> | <id> | <text>      edit a manifesto while campaigning
  register-voter <name> | <id>
  register-candidate <name> | <place> | <id> | <party> | <symbol> | <assets> | <criminal cases>
  candidates | voters                   listings
  quit                                  end the election now and print the report";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Vote { voter: VoterRef, candidate: String },
    Login { voter: VoterRef },
    Start(Duration),
    End,
    Total,
    Breakdown,
    Winner,
    Snapshot,
    Status,
    CampaignStart,
    CampaignEnd,
    Manifesto { name: String, id: String, text: String },
    RegisterVoter { name: String, id: String },
    RegisterCandidate(Vec<String>),
    Candidates,
    Voters,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> election_sim::Result<Option<SessionCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.find(char::is_whitespace) {
        Some(pos) => (&line[..pos], line[pos..].trim()),
        None => (line, ""),
    };
    let args: Vec<String> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('|').map(|arg| arg.trim().to_string()).collect()
    };

    let expect = |count: usize, usage: &str| -> election_sim::Result<()> {
        if args.len() == count {
            Ok(())
        } else {
            Err(ElectionError::Validation(format!("usage: {}", usage)))
        }
    };

    let command = match word.to_lowercase().as_str() {
        "vote" => {
            expect(3, "vote <name> | <id> | <candidate>")?;
            SessionCommand::Vote {
                voter: VoterRef::new(&args[0], &args[1]),
                candidate: args[2].clone(),
            }
        }
        "login" => {
            expect(2, "login <name> | <id>")?;
            SessionCommand::Login {
                voter: VoterRef::new(&args[0], &args[1]),
            }
        }
        "start" => {
            expect(1, "start <seconds>")?;
            SessionCommand::Start(parse_duration(&args[0])?)
        }
        "end" => SessionCommand::End,
        "total" => SessionCommand::Total,
        "breakdown" => SessionCommand::Breakdown,
        "winner" => SessionCommand::Winner,
        "snapshot" => SessionCommand::Snapshot,
        "status" => SessionCommand::Status,
        "campaign" => match rest.to_lowercase().as_str() {
            "start" => SessionCommand::CampaignStart,
            "end" | "stop" => SessionCommand::CampaignEnd,
            _ => return Err(ElectionError::Validation("usage: campaign start|end".to_string())),
        },
        "manifesto" => {
            expect(3, "manifesto <name> | <id> | <text>")?;
            validate_field("manifesto", &args[2])?;
            SessionCommand::Manifesto {
                name: args[0].clone(),
                id: args[1].clone(),
                text: args[2].clone(),
            }
        }
        "register-voter" => {
            expect(2, "register-voter <name> | <id>")?;
            SessionCommand::RegisterVoter {
                name: args[0].clone(),
                id: args[1].clone(),
            }
        }
        "register-candidate" => {
            expect(
                7,
                "register-candidate <name> | <place> | <id> | <party> | <symbol> | <assets> | <criminal cases>",
            )?;
            SessionCommand::RegisterCandidate(args.clone())
        }
        "candidates" => SessionCommand::Candidates,
        "voters" => SessionCommand::Voters,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => {
            return Err(ElectionError::Validation(format!(
                "unknown command '{}', try 'help'",
                other
            )))
        }
    };

    Ok(Some(command))
}

/// Remembers whether the end of the current election has been shown.
#[derive(Debug, Default)]
struct EndNotice {
    announced: bool,
}

impl EndNotice {
    /// True the first time an election is seen ended.
    async fn check(&mut self, session: &Session) -> bool {
        let ended = matches!(session.phase().await, ElectionPhase::Ended { .. });
        let fresh = ended && !self.announced;
        self.announced = ended;
        fresh
    }

    fn reset(&mut self) {
        self.announced = false;
    }
}

/// `quit` closes the polls rather than waiting out the deadline.
async fn close_on_quit(session: &Session) -> election_sim::Result<()> {
    if session.controller().is_running().await {
        session.end_election().await?;
        println!("{}", "Election ended on quit.".bright_magenta().bold());
    }
    Ok(())
}

/// Run one election, reading commands from stdin until `quit` or end of input.
///
/// `quit` ends a running election immediately. At end of input a running
/// election is left to its deadline before the results are printed.
pub async fn run(store: Arc<dyn RecordStore>, duration: Duration, config: ElectionConfig) -> CommandResult {
    let session = Session::open(store, config).await;

    session.start_election(duration).await?;
    println!(
        "🚀 Election started for {} seconds. Type {} for commands.",
        duration.as_secs().to_string().bright_cyan(),
        "help".bright_white()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut watch = tokio::time::interval(Duration::from_millis(250));
    let mut notice = EndNotice::default();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                match parse_line(&line) {
                    Ok(Some(SessionCommand::Quit)) => {
                        close_on_quit(&session).await?;
                        break;
                    }
                    Ok(Some(command)) => {
                        let closes = command == SessionCommand::End;
                        let opens = matches!(command, SessionCommand::Start(_));
                        match execute(&session, command).await {
                            // the winner is already printed
                            Ok(()) if closes => {
                                notice.check(&session).await;
                            }
                            Ok(()) if opens => notice.reset(),
                            Ok(()) => {}
                            Err(e) => println!("{} {}", "⚠️".yellow(), e.to_string().yellow()),
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{} {}", "⚠️".yellow(), e.to_string().yellow()),
                }
            }
            _ = watch.tick() => {
                if notice.check(&session).await {
                    println!("{}", "⏰ Election ended.".bright_magenta().bold());
                    print_report(&session.report().await);
                }
            }
        }
    }

    if let Some(remaining) = session.remaining().await {
        println!(
            "⏳ Input closed, waiting {} seconds for the election to end",
            remaining.as_secs().to_string().bright_cyan()
        );
        tokio::time::sleep(remaining).await;
        // the deadline task runs on its own; give it a moment to finish
        while !matches!(session.phase().await, ElectionPhase::Ended { .. }) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        notice.reset();
    }

    if !notice.announced {
        print_report(&session.report().await);
    }

    Ok(())
}

async fn execute(session: &Session, command: SessionCommand) -> election_sim::Result<()> {
    match command {
        SessionCommand::Vote { voter, candidate } => {
            let receipt = session.cast_vote(&voter, &candidate).await?;
            println!(
                "✅ Vote cast successfully for {} by {}",
                receipt.candidate.bright_green(),
                receipt.voter
            );
        }
        SessionCommand::Login { voter } => match session.login_voter(&voter.name, &voter.id).await? {
            VoterStatus::CanVote => println!("✅ Login Successful! Proceed to vote."),
            VoterStatus::AlreadyVoted => println!("{}", "You have already voted.".yellow()),
        },
        SessionCommand::Start(duration) => {
            session.start_election(duration).await?;
            println!("🚀 Election started for {} seconds.", duration.as_secs());
        }
        SessionCommand::End => match session.end_election().await? {
            Ending::Closed { winner, .. } => {
                println!("{}", "Election Ended.".bright_magenta().bold());
                print_winner(&winner);
            }
            Ending::AlreadyEnded => println!("{}", "Election has already ended.".yellow()),
        },
        SessionCommand::Total => {
            println!("Total Votes Cast: {}", session.live_total().await.to_string().bright_green());
        }
        SessionCommand::Breakdown => {
            for entry in session.vote_breakdown().await? {
                println!("{} : {} votes", entry.name, entry.votes);
            }
        }
        SessionCommand::Winner => print_winner(&session.winner().await?),
        SessionCommand::Snapshot => session.controller().snapshot_collector().print_summary(),
        SessionCommand::Status => {
            println!("{}", session.phase().await);
            if let Some(remaining) = session.remaining().await {
                println!("{} seconds left", remaining.as_secs());
            }
            let campaign = if session.campaign_active() { "running" } else { "stopped" };
            println!("Campaign {}", campaign);
        }
        SessionCommand::CampaignStart => print_campaign(session.start_campaign()),
        SessionCommand::CampaignEnd => print_campaign(session.end_campaign()),
        SessionCommand::Manifesto { name, id, text } => {
            session.set_manifesto(&name, &id, &text).await?;
            println!("✅ Manifesto updated!");
        }
        SessionCommand::RegisterVoter { name, id } => {
            session.register_voter(voter_from_input(&name, &id)?).await?;
            println!("✅ Voter registered successfully!");
        }
        SessionCommand::RegisterCandidate(fields) => {
            let form = CandidateForm {
                name: fields[0].clone(),
                place: fields[1].clone(),
                id: fields[2].clone(),
                party: fields[3].clone(),
                symbol: fields[4].clone(),
                assets: fields[5].clone(),
                criminal_cases: fields[6].clone(),
            };
            session.register_candidate(form.validate()?).await?;
            println!("✅ Candidate registered successfully!");
        }
        SessionCommand::Candidates => {
            for line in session.candidate_summary().await {
                println!("{}", line);
            }
        }
        SessionCommand::Voters => {
            for line in session.voter_list().await {
                println!("{}", line);
            }
        }
        SessionCommand::Help => println!("{}", HELP),
        SessionCommand::Quit => {}
    }

    Ok(())
}

fn print_campaign(change: CampaignChange) {
    match change {
        CampaignChange::Started | CampaignChange::Ended => println!("{}", change.to_string().bright_green()),
        _ => println!("{}", change.to_string().yellow()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pipe_separated_arguments() {
        assert_eq!(
            parse_line("vote Alice Smith | 9 | Xavier").unwrap(),
            Some(SessionCommand::Vote {
                voter: VoterRef::new("Alice Smith", "9"),
                candidate: "Xavier".to_string(),
            })
        );
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("CAMPAIGN start").unwrap(), Some(SessionCommand::CampaignStart));
    }

    #[test]
    fn rejects_bad_durations_and_arity() {
        assert!(matches!(parse_line("start soon"), Err(ElectionError::Validation(_))));
        assert!(matches!(parse_line("vote Alice | 9"), Err(ElectionError::Validation(_))));
        assert!(matches!(parse_line("dance"), Err(ElectionError::Validation(_))));
        assert!(parse_line("manifesto X | 1 | roads, rail").is_err());
    }

    #[test]
    fn parses_candidate_registration() {
        match parse_line("register-candidate X | Town | 1 | Green | Tree | 10 | 0").unwrap() {
            Some(SessionCommand::RegisterCandidate(fields)) => assert_eq!(fields.len(), 7),
            other => panic!("unexpected {:?}", other),
        }
    }

    async fn running_session() -> Session {
        let session = Session::open(
            Arc::new(election_sim::database::MemoryStore::new()),
            ElectionConfig::default(),
        )
        .await;
        session.start_election(Duration::from_secs(600)).await.unwrap();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn manual_end_is_announced_once() {
        let session = running_session().await;
        let mut notice = EndNotice::default();
        assert!(!notice.check(&session).await);

        execute(&session, SessionCommand::End).await.unwrap();
        assert!(notice.check(&session).await);
        assert!(!notice.check(&session).await);

        execute(&session, SessionCommand::Start(Duration::from_secs(5))).await.unwrap();
        notice.reset();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(notice.check(&session).await);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_closes_a_running_election() {
        let session = running_session().await;

        close_on_quit(&session).await.unwrap();
        assert!(matches!(
            session.phase().await,
            ElectionPhase::Ended {
                reason: election_sim::model::election::EndReason::Manual,
                ..
            }
        ));
        assert_eq!(session.remaining().await, None);

        // nothing left to close
        close_on_quit(&session).await.unwrap();
    }
}
