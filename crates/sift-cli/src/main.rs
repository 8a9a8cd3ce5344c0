//! Sift CLI - Tag classification and spending analytics
//!
//! Usage:
//!   sift init                              Initialize database
//!   sift classify merchant wolt -t food    Tag matching transactions
//!   sift report trends --months 6          Month-by-month spending
//!   sift insights                          Auto-generated observations

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> ExitCode {
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

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            commands::exit_code_for(&e)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Accounts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(AccountsAction::List) => commands::cmd_accounts_list(&db, json),
                Some(AccountsAction::Add {
                    name,
                    institution,
                    username,
                    password,
                    user_id,
                    label,
                }) => {
                    let credentials = commands::build_credentials(
                        &institution,
                        username,
                        password,
                        user_id,
                        label,
                    )?;
                    commands::cmd_accounts_add(&db, &name, &institution, &credentials)
                }
            }
        }
        Commands::Tags { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(TagsAction::List) => commands::cmd_tags_list(&db, json),
                Some(TagsAction::Stats) => commands::cmd_tags_stats(&db, json),
                Some(TagsAction::Rename { old_name, new_name }) => {
                    commands::cmd_tags_rename(&db, &old_name, &new_name, json)
                }
                Some(TagsAction::Delete { tag }) => commands::cmd_tags_delete(&db, &tag),
            }
        }
        Commands::Tag {
            transaction_id,
            tags,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_tag(&db, transaction_id, &tags)
        }
        Commands::Untag {
            transaction_id,
            tags,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_untag(&db, transaction_id, &tags)
        }
        Commands::Categorize {
            transaction_id,
            category,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_categorize(&db, transaction_id, category.as_deref())
        }
        Commands::Classify { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let holders = &config.card_holders;
            match action {
                ClassifyAction::Merchant {
                    pattern,
                    tags,
                    scope,
                } => {
                    let scope = commands::resolve_scope(&scope)?;
                    commands::cmd_classify_merchant(&db, holders, scope, &pattern, &tags, json)
                }
                ClassifyAction::Category {
                    category,
                    tags,
                    scope,
                } => {
                    let scope = commands::resolve_scope(&scope)?;
                    commands::cmd_classify_category(&db, holders, scope, &category, &tags, json)
                }
                ClassifyAction::Card {
                    suffix,
                    holder,
                    scope,
                } => {
                    let scope = commands::resolve_scope(&scope)?;
                    commands::cmd_classify_card(&db, holders, scope, &suffix, &holder, json)
                }
                ClassifyAction::Holders { scope } => {
                    let scope = commands::resolve_scope(&scope)?;
                    commands::cmd_classify_holders(&db, holders, scope, json)
                }
                ClassifyAction::Migrate { dry_run, scope } => {
                    let scope = commands::resolve_scope(&scope)?;
                    commands::cmd_classify_migrate(&db, holders, scope, dry_run, json)
                }
            }
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let settings = config.reports;
            match report_type {
                ReportType::Breakdown { period, from, to } => {
                    let (from_date, to_date) =
                        commands::resolve_period(&period, from.as_deref(), to.as_deref())?;
                    commands::cmd_report_breakdown(&db, from_date, to_date, json)
                }
                ReportType::Monthly { month } => {
                    commands::cmd_report_monthly(&db, month.as_deref(), json)
                }
                ReportType::Trends { months, tag, card } => commands::cmd_report_trends(
                    &db,
                    months.unwrap_or(settings.default_months),
                    tag.as_deref(),
                    card.as_deref(),
                    json,
                ),
                ReportType::Categories { months, top } => commands::cmd_report_categories(
                    &db,
                    months.unwrap_or(settings.default_months),
                    top.unwrap_or(settings.top_categories),
                    json,
                ),
                ReportType::Cards { months } => commands::cmd_report_cards(
                    &db,
                    &config.card_holders,
                    months.unwrap_or(settings.default_months),
                    json,
                ),
                ReportType::Tag { tag, from, to } => {
                    let from = commands::parse_date_arg("--from", from.as_deref())?;
                    let to = commands::parse_date_arg("--to", to.as_deref())?;
                    commands::cmd_report_tag(&db, &tag, from, to, json)
                }
            }
        }
        Commands::Insights { months } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_insights(
                &db,
                months.unwrap_or(config.reports.default_months),
                config.reports.top_categories,
                json,
            )
        }
    }
}
