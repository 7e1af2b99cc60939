//! Mixmeter CLI - Mix Evaluation & Scoring Engine
//!
//! Command-line interface for evaluating analyzer feature vectors against
//! style profiles.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use mixmeter::cli::{commands, Cli, Commands, SnapshotCommand, StylesCommand};

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(commands::default_data_dir);

    info!("Mixmeter v{}", env!("CARGO_PKG_VERSION"));

    handle_command(cli.command, &data_dir)
        .with_context(|| format!("data dir: {}", data_dir.display()))
}

fn handle_command(cmd: Commands, data_dir: &std::path::Path) -> anyhow::Result<()> {
    match cmd {
        Commands::Styles { action } => match action {
            StylesCommand::List => commands::styles_list(data_dir)?,
            StylesCommand::Show { name } => commands::styles_show(data_dir, &name)?,
            StylesCommand::Create {
                name,
                description,
                ranges,
            } => commands::styles_create(data_dir, &name, &description, &ranges)?,
            StylesCommand::Update {
                name,
                description,
                ranges,
            } => commands::styles_update(data_dir, &name, description.as_deref(), &ranges)?,
            StylesCommand::Delete { name } => commands::styles_delete(data_dir, &name)?,
        },
        Commands::Evaluate { style, features } => {
            commands::evaluate(data_dir, &style, &features)?
        }
        Commands::Suggest { style, features } => commands::suggest(data_dir, &style, &features)?,
        Commands::Snapshot { action } => match action {
            SnapshotCommand::Save {
                name,
                features,
                style,
            } => commands::snapshot_save(data_dir, &name, &features, style.as_deref())?,
            SnapshotCommand::Show { name } => commands::snapshot_show(data_dir, &name)?,
            SnapshotCommand::List => commands::snapshot_list(data_dir)?,
            SnapshotCommand::Delete { name } => commands::snapshot_delete(data_dir, &name)?,
            SnapshotCommand::Compare { a, b } => commands::snapshot_compare(data_dir, &a, &b)?,
        },
        Commands::Audition {
            style,
            features,
            role,
        } => commands::audition(data_dir, &style, &features, role.as_deref())?,
    }

    Ok(())
}
