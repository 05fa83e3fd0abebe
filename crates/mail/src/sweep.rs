//! The sweep control sequence
//!
//! `Authenticating → Listing → Filtering → (Dispatching | Skipping) → Marking → Done`
//!
//! Any error halts the sequence where it happened. There is no retry, no
//! backoff and no cancellation.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fmt;

use crate::actions::{Dispatcher, MatchedAction};
use crate::config::SweepConfig;
use crate::filter::{FilterOutcome, SenderFilter};
use crate::models::MessageId;
use crate::service::MailService;

/// States of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Authenticating,
    Listing,
    Filtering,
    Dispatching,
    Skipping,
    Marking,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Authenticating => "AUTHENTICATING",
            Phase::Listing => "LISTING",
            Phase::Filtering => "FILTERING",
            Phase::Dispatching => "DISPATCHING",
            Phase::Skipping => "SKIPPING",
            Phase::Marking => "MARKING",
            Phase::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Every message observed and the allow-listed subset
    pub outcome: FilterOutcome,
    /// Whether the matched action ran
    pub action_ran: bool,
    /// IDs marked read (empty on a dry run)
    pub marked: Vec<MessageId>,
    pub dry_run: bool,
    /// Phases entered, in order
    pub phases: Vec<Phase>,
}

impl RunReport {
    fn enter(&mut self, phase: Phase) {
        debug!("Sweep phase: {}", phase);
        self.phases.push(phase);
    }
}

/// One configured sweep over the unread inbox
pub struct Sweep<'a> {
    config: &'a SweepConfig,
    action: &'a dyn MatchedAction,
    dry_run: bool,
}

impl<'a> Sweep<'a> {
    pub fn new(config: &'a SweepConfig, action: &'a dyn MatchedAction) -> Self {
        Self {
            config,
            action,
            dry_run: false,
        }
    }

    /// List and filter only; no action and no modify calls
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Authenticate with `connect`, then run the sequence
    ///
    /// An authentication failure ends the run before anything is listed.
    pub fn connect_and_run<S, F>(&self, connect: F) -> Result<RunReport>
    where
        S: MailService,
        F: FnOnce() -> Result<S>,
    {
        let mut report = RunReport::default();
        report.enter(Phase::Authenticating);
        let service = connect()?;
        self.run_from(&service, report)
    }

    /// Run the sequence against an already authenticated service
    pub fn run(&self, service: &dyn MailService) -> Result<RunReport> {
        self.run_from(service, RunReport::default())
    }

    fn run_from(&self, service: &dyn MailService, mut report: RunReport) -> Result<RunReport> {
        report.dry_run = self.dry_run;

        report.enter(Phase::Listing);
        let summaries = service
            .list_unread(&self.config.labels, self.config.max_messages)
            .with_context(|| format!("Failed to list messages labelled {:?}", self.config.labels))?;
        info!("Found {} unread messages", summaries.len());

        report.enter(Phase::Filtering);
        report.outcome = SenderFilter::from_config(self.config).filter(service, &summaries)?;

        if self.dry_run {
            info!(
                "Dry run: would process {} and mark {} messages read",
                report.outcome.matched.len(),
                report.outcome.all.len()
            );
            report.enter(Phase::Done);
            return Ok(report);
        }

        let dispatcher = Dispatcher::from_config(self.config);

        report.enter(if report.outcome.matched.is_empty() {
            Phase::Skipping
        } else {
            Phase::Dispatching
        });
        report.action_ran = dispatcher.run_action(service, self.action, &report.outcome.matched)?;

        report.enter(Phase::Marking);
        report.marked = dispatcher.mark_read(service, &report.outcome.all)?;

        report.enter(Phase::Done);
        info!("...done");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::LogMatches;
    use crate::models::AllowList;
    use crate::service::InMemoryMailbox;

    fn config_for(senders: &[&str]) -> SweepConfig {
        SweepConfig {
            senders: AllowList::new(senders.iter().copied()),
            ..SweepConfig::default()
        }
    }

    #[test]
    fn test_phases_when_matched() {
        let mailbox = InMemoryMailbox::new();
        mailbox.add_unread("m1", "Ada <ada@x.com>");
        let config = config_for(&["ada@x.com"]);

        let report = Sweep::new(&config, &LogMatches).run(&mailbox).unwrap();
        assert_eq!(
            report.phases,
            vec![Phase::Listing, Phase::Filtering, Phase::Dispatching, Phase::Marking, Phase::Done]
        );
        assert!(report.action_ran);
    }

    #[test]
    fn test_phases_when_nothing_matched() {
        let mailbox = InMemoryMailbox::new();
        mailbox.add_unread("m1", "Bob <bob@x.com>");
        let config = config_for(&["ada@x.com"]);

        let report = Sweep::new(&config, &LogMatches).run(&mailbox).unwrap();
        assert_eq!(
            report.phases,
            vec![Phase::Listing, Phase::Filtering, Phase::Skipping, Phase::Marking, Phase::Done]
        );
        assert!(!report.action_ran);
        assert_eq!(report.marked, vec![MessageId::new("m1")]);
    }

    #[test]
    fn test_dry_run_stops_after_filtering() {
        let mailbox = InMemoryMailbox::new();
        mailbox.add_unread("m1", "ada@x.com");
        let config = config_for(&["ada@x.com"]);

        let report = Sweep::new(&config, &LogMatches)
            .dry_run(true)
            .run(&mailbox)
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.outcome.matched.len(), 1);
        assert_eq!(report.phases.last(), Some(&Phase::Done));
        assert!(mailbox.modify_calls().is_empty());
        assert!(mailbox.is_unread("m1"));
    }

    #[test]
    fn test_authentication_failure_halts_before_listing() {
        let config = config_for(&[]);
        let result = Sweep::new(&config, &LogMatches)
            .connect_and_run(|| -> Result<InMemoryMailbox> { anyhow::bail!("invalid_grant") });
        assert!(result.is_err());
    }

    #[test]
    fn test_connect_and_run_records_authentication() {
        let config = config_for(&[]);
        let report = Sweep::new(&config, &LogMatches)
            .connect_and_run(|| Ok(InMemoryMailbox::new()))
            .unwrap();
        assert_eq!(report.phases.first(), Some(&Phase::Authenticating));
        assert_eq!(report.phases.last(), Some(&Phase::Done));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Dispatching.to_string(), "DISPATCHING");
    }
}
