use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::domain::value_objects::RunMode;

/// hostwatch: periodic host health agent
///
/// Runs every configured check once, prints the report and, when asked,
/// notifies recipients. Meant to be invoked by cron or a systemd timer.
#[derive(Parser, Debug)]
#[command(name = "hostwatch")]
#[command(version, about, long_about)]
#[command(group(ArgGroup::new("mode").args(["notify", "test_notify", "poll_updates"])))]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not print the report
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Notify recipients when any check is WARN or CRIT
    #[arg(short, long)]
    pub notify: bool,

    /// Skip checks and send a test message to every recipient
    #[arg(long)]
    pub test_notify: bool,

    /// Skip checks and only register subscribers from inbound messages
    #[arg(long)]
    pub poll_updates: bool,
}

impl Cli {
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        if self.notify {
            RunMode::Notify
        } else if self.test_notify {
            RunMode::TestNotify
        } else if self.poll_updates {
            RunMode::PollOnly
        } else {
            RunMode::Collect
        }
    }
}
