use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "contactsync", version, about = "One-way CRM contact synchronization")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The parsed command, with a bare invocation resolved as `serve` so its env fallbacks apply.
    pub fn command_or_serve(self) -> Result<Commands, clap::Error> {
        if let Some(cmd) = self.command {
            return Ok(cmd);
        }
        Cli::try_parse_from(["contactsync", "serve"])?
            .command
            .ok_or_else(|| clap::Error::new(clap::error::ErrorKind::MissingSubcommand))
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default if no subcommand given).
    Serve {
        #[arg(long, env = "CONTACTSYNC_ADDR", default_value = "0.0.0.0:8000")]
        addr: SocketAddr,

        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Run one sync pass and print the run result as JSON.
    Sync {
        #[command(flatten)]
        store: StoreArgs,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print stored contacts, most recently synced first.
    List {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print recent sync run results.
    Runs {
        #[command(flatten)]
        store: StoreArgs,

        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    /// SQLite database file holding contacts and the run log.
    #[arg(long, env = "CONTACTSYNC_DB_PATH", default_value = ".contactsync/contacts.db")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// HubSpot CRM (requires HUBSPOT_ACCESS_TOKEN).
    Hubspot,
    /// Local JSON document (requires --contacts-file).
    File,
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    #[arg(long, env = "CONTACTSYNC_SOURCE", value_enum, default_value_t = SourceKind::Hubspot)]
    pub source: SourceKind,

    /// Path to the JSON contacts document for `--source file`.
    #[arg(long, env = "CONTACTSYNC_CONTACTS_FILE")]
    pub contacts_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_with_file_source() {
        let cli = Cli::try_parse_from([
            "contactsync",
            "sync",
            "--db-path",
            "/tmp/c.db",
            "--source",
            "file",
            "--contacts-file",
            "contacts.json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Sync { store, source }) => {
                assert_eq!(store.db_path, PathBuf::from("/tmp/c.db"));
                assert_eq!(source.source, SourceKind::File);
                assert_eq!(source.contacts_file, Some(PathBuf::from("contacts.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::try_parse_from(["contactsync"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn bare_invocation_serves_with_env_fallbacks() {
        std::env::set_var("CONTACTSYNC_DB_PATH", "/data/from-env.db");
        let resolved = Cli::try_parse_from(["contactsync"])
            .unwrap()
            .command_or_serve();
        std::env::remove_var("CONTACTSYNC_DB_PATH");

        match resolved.unwrap() {
            Commands::Serve { store, .. } => {
                assert_eq!(store.db_path, PathBuf::from("/data/from-env.db"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
