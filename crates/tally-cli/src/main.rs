//! Tally CLI - AI expense extraction for shared-expense groups
//!
//! Usage:
//!   tally init                                   Initialize database
//!   tally group create --name Depto              Create a group
//!   tally analyze text --group G --user U --text "almuerzo 40"
//!   tally reconcile --group G --user U --response reply.json

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Group { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                GroupAction::Create {
                    name,
                    split,
                    no_seed,
                } => commands::cmd_group_create(&db, &name, &split, !no_seed).map(|_| ()),
                GroupAction::List => commands::cmd_group_list(&db),
            }
        }
        Commands::User { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                UserAction::Create { name, email } => {
                    commands::cmd_user_create(&db, &name, email.as_deref()).map(|_| ())
                }
                UserAction::List => commands::cmd_user_list(&db),
            }
        }
        Commands::Member { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                MemberAction::Add {
                    group,
                    user,
                    percent,
                    admin,
                } => commands::cmd_member_add(&db, &group, &user, percent, admin).map(|_| ()),
                MemberAction::List { group } => commands::cmd_member_list(&db, &group),
                MemberAction::Leave { group, user } => {
                    commands::cmd_member_leave(&db, &group, &user)
                }
                MemberAction::Remove { group, user } => {
                    commands::cmd_member_remove(&db, &group, &user)
                }
                MemberAction::Approve { group, user } => {
                    commands::cmd_member_approve(&db, &group, &user)
                }
            }
        }
        Commands::Category { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                CategoryAction::Add { group, name } => {
                    commands::cmd_category_add(&db, &group, &name).map(|_| ())
                }
                CategoryAction::List { group } => commands::cmd_category_list(&db, &group),
                CategoryAction::Disable { id } => commands::cmd_category_disable(&db, &id),
            }
        }
        Commands::Analyze { action } => {
            let db = commands::open_db(&cli.db)?;
            let analyzer = commands::build_analyzer(db, &config)?;
            match action {
                AnalyzeAction::Text {
                    group,
                    user,
                    text,
                    tz_offset,
                } => commands::cmd_analyze_text(&analyzer, &group, &user, &text, tz_offset).await,
                AnalyzeAction::Image { group, user, files } => {
                    commands::cmd_analyze_images(&analyzer, &group, &user, &files).await
                }
                AnalyzeAction::Audio {
                    group,
                    user,
                    file,
                    mime,
                } => {
                    commands::cmd_analyze_audio(&analyzer, &group, &user, &file, mime.as_deref())
                        .await
                }
            }
        }
        Commands::Reconcile {
            group,
            user,
            response,
            channel,
            tz_offset,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_reconcile(&db, &config, &group, &user, &response, &channel, tz_offset)
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(&config),
            Some(PromptsAction::Show { prompt_id }) => {
                commands::cmd_prompts_show(&config, &prompt_id)
            }
            Some(PromptsAction::Path) => commands::cmd_prompts_path(&config),
        },
    }
}
