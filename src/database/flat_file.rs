/// Comma separated record files, one row per entity.
use super::{RecordStore, Records, Result};
use crate::model::election::{Candidate, Voter};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const CANDIDATE_FILE: &str = "candidate.txt";
pub const VOTER_FILE: &str = "voter.txt";

const DELIMITER: char = ',';
const CANDIDATE_FIELDS: usize = 9;
const VOTER_FIELDS: usize = 3;

pub struct FlatFileStore {
    candidate_path: PathBuf,
    voter_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FlatFileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            candidate_path: data_dir.join(CANDIDATE_FILE),
            voter_path: data_dir.join(VOTER_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn candidate_path(&self) -> &Path {
        &self.candidate_path
    }

    pub fn voter_path(&self) -> &Path {
        &self.voter_path
    }
}

#[async_trait]
impl RecordStore for FlatFileStore {
    async fn load(&self) -> Result<Records> {
        let candidates = read_rows(&self.candidate_path, parse_candidate_row).await;
        let voters = read_rows(&self.voter_path, parse_voter_row).await;

        Ok(Records { candidates, voters })
    }

    async fn save(&self, records: &Records) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let candidates: Vec<String> = records.candidates.iter().map(candidate_row).collect();
        let voters: Vec<String> = records.voters.iter().map(voter_row).collect();

        rewrite(&self.candidate_path, &candidates).await?;
        rewrite(&self.voter_path, &voters).await?;

        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "{} + {}",
            self.candidate_path.display(),
            self.voter_path.display()
        )
    }
}

/// Encode a candidate as `name,place,id,party,symbol,assets,criminalCases,manifesto,votes`.
pub fn candidate_row(candidate: &Candidate) -> String {
    let fields = [
        candidate.name.as_str(),
        candidate.place.as_str(),
        candidate.id.as_str(),
        candidate.party.as_str(),
        candidate.symbol.as_str(),
        candidate.assets.as_str(),
        candidate.criminal_cases.as_str(),
        candidate.manifesto.as_str(),
    ];
    warn_on_delimiter("candidate", &candidate.id, &fields);

    format!("{},{}", fields.join(","), candidate.votes)
}

/// Decode a candidate row. Short rows are skipped and a malformed vote count
/// reads as zero.
pub fn parse_candidate_row(line: &str) -> Option<Candidate> {
    let parts: Vec<&str> = line.split(DELIMITER).collect();
    if parts.len() < CANDIDATE_FIELDS {
        return None;
    }

    let mut candidate = Candidate::new(
        parts[0], parts[1], parts[2], parts[3], parts[4], parts[5], parts[6],
    );
    candidate.manifesto = parts[7].to_string();
    candidate.votes = parts[8].trim().parse().unwrap_or(0);

    Some(candidate)
}

pub fn voter_row(voter: &Voter) -> String {
    warn_on_delimiter("voter", &voter.id, &[voter.name.as_str(), voter.id.as_str()]);
    format!("{},{},{}", voter.name, voter.id, voter.has_voted)
}

pub fn parse_voter_row(line: &str) -> Option<Voter> {
    let parts: Vec<&str> = line.split(DELIMITER).collect();
    if parts.len() < VOTER_FIELDS {
        return None;
    }

    let mut voter = Voter::new(parts[0], parts[1]);
    voter.has_voted = parts[2].trim() == "true";

    Some(voter)
}

fn warn_on_delimiter(kind: &str, id: &str, fields: &[&str]) {
    if fields.iter().any(|field| field.contains(DELIMITER)) {
        tracing::warn!(kind, id, "field contains the record delimiter; row will not reload intact");
    }
}

/// Read one record file on its own. An unreadable file yields no rows so the
/// other file still loads.
async fn read_rows<T>(path: &Path, parse: fn(&str) -> Option<T>) -> Vec<T> {
    match read_lines(path).await {
        Ok(lines) => lines.iter().filter_map(|line| parse(line)).collect(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read record file");
            Vec::new()
        }
    }
}

async fn read_lines(path: &Path) -> Result<Vec<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.to_string())
            .collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

async fn rewrite(path: &Path, rows: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut content = rows.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, path).await?;

    Ok(())
}
