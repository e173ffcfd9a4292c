//! factory-access command line tool
//!
//! Inspect catalogs, convert edit-time permission maps and evaluate access
//! for a stored user record.
//!
//! # Usage
//!
//! ```bash
//! # Convert an edit map into permission metadata
//! factory-access --catalog catalog.json convert tree.json
//!
//! # Check a single grant
//! factory-access --catalog catalog.json check user.json kerur store kr_place_order
//!
//! # List what a user can reach
//! FACTORY_ACCESS_CATALOG=catalog.json factory-access list user.json kerur
//! ```
//!
//! Run with: cargo run --features cli --bin factory-access

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use factory_access::{
    to_metadata, AccessError, AccessQuery, CapabilityCatalog, Result, SelectionAggregator, SelectionNode,
    TreePermissionMap, UserAccessSubject, UserRecord,
};

#[derive(Parser)]
#[command(name = "factory-access")]
#[command(version)]
#[command(about = "Evaluate factory/department/service permissions against a capability catalog")]
struct Cli {
    /// Capability catalog JSON file
    #[arg(long, short, env = "FACTORY_ACCESS_CATALOG")]
    catalog: PathBuf,

    /// Derive permission metadata for user records that only carry legacy permissions
    #[arg(long, global = true)]
    upgrade_legacy: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a tree-permission map into permission metadata
    Convert {
        /// Tree map JSON file ({"factory.department.service": bool})
        tree: PathBuf,
        /// Also print the leaf keys recovered from the metadata
        #[arg(long)]
        leaves: bool,
    },

    /// Check access for a user record
    Check {
        /// User record JSON file
        user: PathBuf,
        factory: String,
        department: Option<String>,
        service: Option<String>,
    },

    /// List the factories, departments or services a user can reach
    List {
        /// User record JSON file
        user: PathBuf,
        factory: Option<String>,
        department: Option<String>,
    },

    /// Print the catalog leaf keys under a factory or department
    Leaves {
        factory: String,
        department: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

/// Returns `Ok(false)` when a check denies access
fn run(cli: Cli) -> Result<bool> {
    let catalog = CapabilityCatalog::from_path(&cli.catalog)?;

    match cli.command {
        Commands::Convert { tree, leaves } => {
            let tree: TreePermissionMap = read_json(&tree)?;
            let meta = to_metadata(&tree, &catalog);
            println!("{}", serde_json::to_string_pretty(&meta)?);
            if leaves {
                for leaf in meta.leaves() {
                    println!("{leaf}");
                }
            }
            Ok(true)
        }
        Commands::Check { user, factory, department, service } => {
            let subject = load_subject(&user, &catalog, cli.upgrade_legacy)?;
            let query = AccessQuery::new(&catalog, Some(&subject));
            let allowed = match (department, service) {
                (Some(d), Some(s)) => query.can_access_service(&s, &factory, &d),
                (Some(d), None) => query.can_access_factory_department(&factory, &d),
                _ => query.can_access_factory(&factory),
            };
            println!("{allowed}");
            Ok(allowed)
        }
        Commands::List { user, factory, department } => {
            let subject = load_subject(&user, &catalog, cli.upgrade_legacy)?;
            let query = AccessQuery::new(&catalog, Some(&subject));
            let items = match (factory, department) {
                (Some(f), Some(d)) => query.get_user_services(&f, &d),
                (Some(f), None) => query.get_user_departments(&f),
                _ => query.get_user_factories(),
            };
            println!("{}", serde_json::to_string(&items)?);
            Ok(true)
        }
        Commands::Leaves { factory, department } => {
            let node = match department {
                Some(d) => SelectionNode::department(&factory, &d),
                None => SelectionNode::factory(&factory),
            };
            for key in SelectionAggregator::new(&catalog).leaf_keys(&node) {
                println!("{key}");
            }
            Ok(true)
        }
    }
}

fn load_subject(path: &Path, catalog: &CapabilityCatalog, upgrade: bool) -> Result<UserAccessSubject> {
    let mut record: UserRecord = read_json(path)?;
    if upgrade && record.upgrade_legacy(catalog) {
        tracing::info!(path = %path.display(), "derived permission metadata from legacy permissions");
    }
    Ok(UserAccessSubject::from_record(&record))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .map_err(|source| AccessError::Io { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_str(&json)?)
}
