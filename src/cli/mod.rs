pub mod commands;
pub mod theme;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "porter")]
#[command(about = "Export and import content records, keeping references intact")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to settings.json in the config directory)
    #[arg(long, global = true, env = "PORTER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Content database
    #[arg(long, global = true, env = "PORTER_DB")]
    pub db: Option<PathBuf>,

    /// JSON file with extra transfer descriptors
    #[arg(long, global = true)]
    pub descriptors: Option<PathBuf>,

    /// Site name used in export file names
    #[arg(long, global = true)]
    pub site: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List the registered transfers
    Descriptors,

    /// Export every record a transfer covers to a JSON document
    Export {
        /// Transfer name
        transfer: String,

        /// Output directory (defaults to the configured export directory)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Overwrite an existing export without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Import a JSON document produced by `export`
    Import {
        /// Transfer name
        transfer: String,

        /// Document to import
        file: PathBuf,
    },
}

impl Cli {
    /// Command-line flags win over the settings file.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(db) = &self.db {
            settings.db_path = db.clone();
        }
        if let Some(descriptors) = &self.descriptors {
            settings.descriptors_file = Some(descriptors.clone());
        }
        if let Some(site) = &self.site {
            settings.site_name = site.clone();
        }
    }
}
