use std::sync::atomic::{AtomicBool, Ordering};

/// Result of toggling the campaign flag. Repeating a toggle is a notice, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignChange {
    Started,
    Ended,
    AlreadyRunning,
    AlreadyStopped,
}

impl std::fmt::Display for CampaignChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignChange::Started => write!(f, "Campaign started."),
            CampaignChange::Ended => write!(f, "Campaign ended."),
            CampaignChange::AlreadyRunning => write!(f, "Campaign is already running."),
            CampaignChange::AlreadyStopped => write!(f, "Campaign is not running."),
        }
    }
}

/// Gate for manifesto edits, independent of the election phase.
#[derive(Debug, Default)]
pub struct CampaignFlag {
    active: AtomicBool,
}

impl CampaignFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) -> CampaignChange {
        if self.active.swap(true, Ordering::SeqCst) {
            CampaignChange::AlreadyRunning
        } else {
            tracing::info!("campaign started");
            CampaignChange::Started
        }
    }

    pub fn end(&self) -> CampaignChange {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::info!("campaign ended");
            CampaignChange::Ended
        } else {
            CampaignChange::AlreadyStopped
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
