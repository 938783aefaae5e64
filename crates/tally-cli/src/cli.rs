//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Turn receipts, voice memos and notes into shared expenses
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "AI expense extraction for shared-expense groups", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.local/share/tally/config.toml, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage group membership
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },

    /// Manage group categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Extract an expense with the configured AI provider
    Analyze {
        #[command(subcommand)]
        action: AnalyzeAction,
    },

    /// Run a saved provider response through parsing, validation and reconciliation
    Reconcile {
        /// Group ID
        #[arg(long)]
        group: String,

        /// Requesting user ID
        #[arg(long)]
        user: String,

        /// File containing the raw provider response
        #[arg(long)]
        response: PathBuf,

        /// Channel the response came from: audio, images, text
        #[arg(long, default_value = "text")]
        channel: String,

        /// Caller's timezone offset in hours (e.g. -3)
        #[arg(long, allow_negative_numbers = true)]
        tz_offset: Option<f64>,
    },

    /// Manage AI prompts (list, show, customize)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum GroupAction {
    /// Create a group (seeded with the default categories)
    Create {
        /// Group name
        #[arg(long)]
        name: String,

        /// Split policy: equal, percentage
        #[arg(long, default_value = "equal")]
        split: String,

        /// Don't add the default categories
        #[arg(long)]
        no_seed: bool,
    },

    /// List all groups
    List,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user
    Create {
        /// Display name
        #[arg(long)]
        name: String,

        /// Email address
        #[arg(long)]
        email: Option<String>,
    },

    /// List all users
    List,
}

#[derive(Subcommand)]
pub enum MemberAction {
    /// Add a user to a group (a removed user rejoins as pending)
    Add {
        /// Group ID
        #[arg(long)]
        group: String,

        /// User ID
        #[arg(long)]
        user: String,

        /// Default split percentage (percentage groups)
        #[arg(long)]
        percent: Option<f64>,

        /// Make the member a group admin
        #[arg(long)]
        admin: bool,
    },

    /// List a group's members
    List {
        /// Group ID
        #[arg(long)]
        group: String,
    },

    /// Leave a group
    Leave {
        /// Group ID
        #[arg(long)]
        group: String,

        /// User ID
        #[arg(long)]
        user: String,
    },

    /// Remove a member from a group
    Remove {
        /// Group ID
        #[arg(long)]
        group: String,

        /// User ID
        #[arg(long)]
        user: String,
    },

    /// Approve a pending member
    Approve {
        /// Group ID
        #[arg(long)]
        group: String,

        /// User ID
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Add a category to a group
    Add {
        /// Group ID
        #[arg(long)]
        group: String,

        /// Category name
        #[arg(long)]
        name: String,
    },

    /// List a group's categories
    List {
        /// Group ID
        #[arg(long)]
        group: String,
    },

    /// Deactivate a category
    Disable {
        /// Category ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum AnalyzeAction {
    /// Analyze a typed expense description
    Text {
        /// Group ID
        #[arg(long)]
        group: String,

        /// Requesting user ID
        #[arg(long)]
        user: String,

        /// Expense description (e.g. "almuerzo 40, pagó Ana")
        #[arg(long)]
        text: String,

        /// Caller's timezone offset in hours (e.g. -3)
        #[arg(long, allow_negative_numbers = true)]
        tz_offset: Option<f64>,
    },

    /// Analyze receipt photos
    Image {
        /// Group ID
        #[arg(long)]
        group: String,

        /// Requesting user ID
        #[arg(long)]
        user: String,

        /// Image file (repeat for multi-page receipts, up to 10)
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },

    /// Analyze a voice memo
    Audio {
        /// Group ID
        #[arg(long)]
        group: String,

        /// Requesting user ID
        #[arg(long)]
        user: String,

        /// Audio file
        #[arg(long)]
        file: PathBuf,

        /// Mime type (guessed from the extension if omitted)
        #[arg(long)]
        mime: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (analyze_images, analyze_text)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
