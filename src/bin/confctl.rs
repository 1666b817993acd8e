//! Command-line access to layered configuration files.
//!
//! Works directly on the files, without a running agent. Structured
//! commands go through `ConfigStore` (overlay with `--env`, dot-path get and
//! set, backups); `ini-*` commands go through `FlatDocumentStore`.
//!
//! ```text
//! confctl --dir Configs --env prod show app.json
//! confctl set app.json db.port 5433
//! confctl restore app.json app.20240101120000.json
//! confctl ini-merge defaults.ini local.ini
//! ```

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use layered_config::document::{self, get_path};
use layered_config::observability::logging::init_logging;
use layered_config::settings::schema::ObservabilitySettings;
use layered_config::{ConfigDescriptor, ConfigStore, FlatDocumentStore, StoreOptions};

#[derive(Parser)]
#[command(name = "confctl")]
#[command(about = "Inspect and edit layered configuration files", long_about = None)]
struct Cli {
    /// Directory holding structured config files
    #[arg(short, long, default_value = "Configs")]
    dir: PathBuf,

    /// Environment overlay to apply on reads (e.g. prod for app.prod.json)
    #[arg(short, long)]
    env: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a config document with its environment overlay applied
    Show { file: String },
    /// Print the value at a dot-path
    Get { file: String, path: String },
    /// Set the value at a dot-path (JSON literal, or plain string)
    Set { file: String, path: String, value: String },
    /// Copy the current file into the backup directory
    Backup { file: String },
    /// Restore the file from a named backup
    Restore { file: String, backup: String },
    /// List backups, newest first
    Backups { file: String },
    /// Read a key from a flat (INI-style) file
    IniGet { file: PathBuf, section: String, key: String },
    /// Write a key to a flat file
    IniSet { file: PathBuf, section: String, key: String, value: String },
    /// Check a flat file against the strict grammar
    IniValidate { file: PathBuf },
    /// Overlay every key of SOURCE onto TARGET
    IniMerge { source: PathBuf, target: PathBuf },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&ObservabilitySettings {
        log_level: "warn".to_string(),
        ..ObservabilitySettings::default()
    })?;

    let store = ConfigStore::new(StoreOptions {
        base_dir: cli.dir.clone(),
        ..StoreOptions::default()
    });
    let descriptor = |file: &str| -> ConfigDescriptor {
        let descriptor = store.descriptor(file);
        match &cli.env {
            Some(env) => descriptor.with_environment(env.clone()),
            None => descriptor,
        }
    };
    let flat = FlatDocumentStore::new();

    match cli.command {
        Commands::Show { ref file } => {
            match store.load_document_with_environment(&descriptor(file))? {
                Some(doc) => print_json(&doc)?,
                None => eprintln!("{file}: not found"),
            }
        }
        Commands::Get { ref file, ref path } => {
            let doc = store.load_document_with_environment(&descriptor(file))?;
            match doc.as_ref().and_then(|d| get_path(d, path)) {
                Some(value) => print_json(value)?,
                None => eprintln!("{file}: '{path}' not set"),
            }
        }
        Commands::Set { ref file, ref path, ref value } => {
            let value: Value =
                serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.clone()));
            store.update_path(&descriptor(file), path, &value)?;
        }
        Commands::Backup { ref file } => match store.backup(&descriptor(file))? {
            Some(path) => println!("{}", path.display()),
            None => eprintln!("{file}: nothing to back up"),
        },
        Commands::Restore { ref file, ref backup } => {
            store.restore(&descriptor(file), backup)?;
        }
        Commands::Backups { ref file } => {
            for path in store.list_backups(&descriptor(file))? {
                if let Some(name) = path.file_name() {
                    println!("{}", name.to_string_lossy());
                }
            }
        }
        Commands::IniGet { ref file, ref section, ref key } => {
            match flat.get_value(file, section, key)? {
                Some(value) => println!("{value}"),
                None => eprintln!("[{section}] {key}: not set"),
            }
        }
        Commands::IniSet { ref file, ref section, ref key, ref value } => {
            flat.set_value(file, section, key, value)?;
        }
        Commands::IniValidate { ref file } => {
            if flat.validate(file) {
                println!("valid");
            } else {
                println!("invalid");
                std::process::exit(1);
            }
        }
        Commands::IniMerge { ref source, ref target } => {
            flat.merge(source, target)?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = document::serialize(value, true)?;
    println!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}
