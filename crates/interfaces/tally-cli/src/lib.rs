pub mod commands;
pub mod watch;

use clap::ValueEnum;
use tally_core::entry::EntryStatus;
use tally_net::{DockerAction, ServiceAction};

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum CliServiceAction {
    Start,
    Stop,
    Restart,
}

impl From<CliServiceAction> for ServiceAction {
    fn from(a: CliServiceAction) -> Self {
        match a {
            CliServiceAction::Start => ServiceAction::Start,
            CliServiceAction::Stop => ServiceAction::Stop,
            CliServiceAction::Restart => ServiceAction::Restart,
        }
    }
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum CliDockerAction {
    Start,
    Stop,
    Restart,
    Remove,
}

impl From<CliDockerAction> for DockerAction {
    fn from(a: CliDockerAction) -> Self {
        match a {
            CliDockerAction::Start => DockerAction::Start,
            CliDockerAction::Stop => DockerAction::Stop,
            CliDockerAction::Restart => DockerAction::Restart,
            CliDockerAction::Remove => DockerAction::Remove,
        }
    }
}

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum CliEntryFilter {
    Pending,
    Generating,
    Completed,
    Error,
}

impl From<CliEntryFilter> for EntryStatus {
    fn from(f: CliEntryFilter) -> Self {
        match f {
            CliEntryFilter::Pending => EntryStatus::Pending,
            CliEntryFilter::Generating => EntryStatus::Generating,
            CliEntryFilter::Completed => EntryStatus::Completed,
            CliEntryFilter::Error => EntryStatus::Error,
        }
    }
}
