use clap::Parser;
use contactsync_core::{ContactReader, SyncRunLog, SyncRunQuery, SyncTrigger};
use contactsync_server::backends;
use contactsync_server::cli::{Cli, Commands};
use contactsync_server::extract::AuthConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    contactsync_core::o11y::init_tracing_from_env()?;
    let cmd = Cli::parse().command_or_serve().unwrap_or_else(|e| e.exit());

    match cmd {
        Commands::Serve {
            addr,
            store,
            source,
        } => {
            let state = backends::build_state(&store, &source).await?;
            contactsync_server::server::serve(addr, state, AuthConfig::from_env()).await?;
        }
        Commands::Sync { store, source } => {
            let db = backends::open_store(&store).await?;
            let engine = backends::build_engine(backends::build_source(&source)?, db).await?;
            let run = engine.run(SyncTrigger::Cli).await;
            println!("{}", serde_json::to_string_pretty(&run)?);
            if !run.succeeded {
                anyhow::bail!(
                    "sync failed: {}",
                    run.error_message().unwrap_or("unknown error")
                );
            }
        }
        Commands::List { store } => {
            let db = backends::open_store(&store).await?;
            let contacts = ContactReader::new(db).list_all().await?;
            println!("{}", serde_json::to_string_pretty(&contacts)?);
        }
        Commands::Runs { store, limit } => {
            let db = backends::open_store(&store).await?;
            let runs = db.list_runs(SyncRunQuery { limit, offset: 0 }).await?;
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }
    }

    Ok(())
}
