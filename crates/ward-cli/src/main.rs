//! Ward CLI
//!
//! Usage:
//!   ward acl allow:read,write=alice deny:write=guests     Build an ACL
//!   ward acl --operations allow:manage=ops                Operation ACL
//!   ward config --file ward.json                          Effective config

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use ward::{AclBuilder, WardConfig};

/// Ward - build validated ACLs and inspect client safety configuration
#[derive(Parser, Debug)]
#[command(name = "ward")]
#[command(about = "Build validated ACLs and inspect client safety configuration")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an ACL from entries and print it as JSON
    Acl {
        /// Only accept these permissions (comma separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "operations")]
        restrict: Option<Vec<String>>,

        /// Only accept operation ACL permissions
        #[arg(long)]
        operations: bool,

        /// Entries in order, as ACTION:PERMS=SUBJECTS (lists comma separated)
        #[arg(value_name = "ENTRY")]
        entries: Vec<EntryArg>,
    },
    /// Print the effective configuration as JSON
    Config {
        /// JSON config file (defaults apply when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

/// One ACL entry as written on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
struct EntryArg {
    action: String,
    permissions: Vec<String>,
    subjects: Vec<String>,
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl FromStr for EntryArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (action, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("expected ACTION:PERMS=SUBJECTS, got '{s}'"))?;
        let (permissions, subjects) = rest
            .split_once('=')
            .ok_or_else(|| format!("expected PERMS=SUBJECTS after ':', got '{rest}'"))?;
        Ok(Self {
            action: action.trim().to_string(),
            permissions: split_list(permissions),
            subjects: split_list(subjects),
        })
    }
}

fn build_acl(
    restrict: Option<Vec<String>>,
    operations: bool,
    entries: Vec<EntryArg>,
) -> anyhow::Result<AclBuilder> {
    let mut builder = match restrict {
        Some(allowed) => AclBuilder::restricted(allowed),
        None if operations => AclBuilder::for_operations(),
        None => AclBuilder::new(),
    };

    for (index, entry) in entries.into_iter().enumerate() {
        builder
            .append(&entry.action, entry.permissions, entry.subjects)
            .with_context(|| format!("entry {} rejected", index + 1))?;
    }
    tracing::debug!(entries = builder.len(), "built ACL");
    Ok(builder)
}

fn main() -> anyhow::Result<()> {
    // Output to stderr so logs never mix with the JSON on stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let args = Args::parse();

    match args.command {
        Command::Acl {
            restrict,
            operations,
            entries,
        } => {
            let builder = build_acl(restrict, operations, entries)?;
            println!("{}", serde_json::to_string_pretty(&builder.build())?);
        }
        Command::Config { file } => {
            let config = match file {
                Some(path) => WardConfig::load(&path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
                None => WardConfig::default(),
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
