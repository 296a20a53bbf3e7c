//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dealroom_core::{ParticipantId, SenderKind};
use dealroom_settings::DealroomSettings;

/// Chat between a loan applicant and their sales manager.
#[derive(Parser, Debug)]
#[command(name = "dealroom", about = "Dealroom chat from the terminal")]
pub struct Cli {
    /// Settings file (defaults to `~/.dealroom/settings.json`).
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Join a room and chat over stdin/stdout.
    Chat(ChatArgs),
    /// Print a saved conversation (a JSON array of message records).
    History(HistoryArgs),
}

/// Which side of the conversation the terminal speaks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// The loan applicant.
    #[default]
    User,
    /// The applicant's sales manager.
    #[value(name = "sales_manager", alias = "sales-manager", alias = "manager")]
    SalesManager,
}

impl Role {
    /// Sender kind stamped on outgoing messages.
    pub fn sender_kind(self) -> SenderKind {
        match self {
            Self::User => SenderKind::User,
            Self::SalesManager => SenderKind::SalesManager,
        }
    }
}

/// Arguments for `dealroom chat`.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Applicant ID.
    #[arg(long)]
    pub user: String,

    /// Sales manager ID.
    #[arg(long)]
    pub manager: String,

    /// Side to speak for.
    #[arg(long = "as", value_enum, default_value_t = Role::User)]
    pub role: Role,

    /// Display name on your own messages.
    #[arg(long)]
    pub name: Option<String>,

    /// Display name on the other side's messages.
    #[arg(long)]
    pub their_name: Option<String>,

    /// Realtime endpoint; derived from settings when omitted.
    #[arg(long)]
    pub endpoint: Option<String>,
}

impl ChatArgs {
    /// `(self, counterpart)` IDs for the chosen role.
    pub fn participants(&self) -> (ParticipantId, ParticipantId) {
        let user = ParticipantId::from(self.user.as_str());
        let manager = ParticipantId::from(self.manager.as_str());
        match self.role {
            Role::User => (user, manager),
            Role::SalesManager => (manager, user),
        }
    }

    /// Explicit `--endpoint`, else the one derived from `settings`.
    pub fn endpoint(&self, settings: &DealroomSettings) -> dealroom_settings::Result<String> {
        match &self.endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => settings.realtime.resolve_endpoint(),
        }
    }
}

/// Arguments for `dealroom history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// JSON file holding an array of message records.
    pub file: PathBuf,

    /// Name shown on every message.
    #[arg(long)]
    pub name: Option<String>,
}
