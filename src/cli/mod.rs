//! CLI Module
//!
//! Command-line interface over the evaluation engine. Feature vectors are
//! supplied as JSON files produced by the external analyzer; results print
//! as pretty JSON so a calling agent can consume them directly.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mixmeter - scores audio feature vectors against style profiles
#[derive(Parser, Debug)]
#[command(name = "mixmeter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Data directory for user styles and snapshots
    /// (default: $MIXMETER_DATA_DIR, then ~/.mixmeter)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage style profiles
    Styles {
        #[command(subcommand)]
        action: StylesCommand,
    },

    /// Evaluate a feature vector against a style profile
    Evaluate {
        /// Style profile name
        #[arg(short, long)]
        style: String,

        /// Feature vector JSON file
        #[arg(short, long)]
        features: PathBuf,
    },

    /// Evaluate and print only the ranked suggestions
    Suggest {
        /// Style profile name
        #[arg(short, long)]
        style: String,

        /// Feature vector JSON file
        #[arg(short, long)]
        features: PathBuf,
    },

    /// Manage and compare named snapshots
    Snapshot {
        #[command(subcommand)]
        action: SnapshotCommand,
    },

    /// Classify a soloed track's role and judge its fit against a style
    Audition {
        /// Style profile name
        #[arg(short, long)]
        style: String,

        /// Feature vector JSON file
        #[arg(short, long)]
        features: PathBuf,

        /// Pin the role instead of auto-classifying
        /// (bass, lead, pad, percussion, texture)
        #[arg(short, long)]
        role: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum StylesCommand {
    /// List all style profiles with their origin
    List,

    /// Print a resolved style profile
    Show {
        /// Profile name
        name: String,
    },

    /// Create a user style profile
    Create {
        /// Profile name
        name: String,

        /// Profile description
        #[arg(short, long, default_value = "")]
        description: String,

        /// JSON file with the target ranges
        #[arg(short, long)]
        ranges: PathBuf,
    },

    /// Merge partial ranges into a user style (overrides a built-in on
    /// first update)
    Update {
        /// Profile name
        name: String,

        /// New description, if changing it
        #[arg(short, long)]
        description: Option<String>,

        /// JSON file with the ranges to merge in
        #[arg(short, long)]
        ranges: PathBuf,
    },

    /// Delete a user style profile
    Delete {
        /// Profile name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
    /// Save a feature vector under a name
    Save {
        /// Snapshot name
        name: String,

        /// Feature vector JSON file
        #[arg(short, long)]
        features: PathBuf,

        /// Style being evaluated against at capture time
        #[arg(short, long)]
        style: Option<String>,
    },

    /// Print a saved snapshot
    Show {
        /// Snapshot name
        name: String,
    },

    /// List snapshot names, most recent first
    List,

    /// Delete a snapshot
    Delete {
        /// Snapshot name
        name: String,
    },

    /// Per-metric deltas from snapshot A to snapshot B
    Compare {
        /// First snapshot name
        a: String,

        /// Second snapshot name
        b: String,
    },
}
