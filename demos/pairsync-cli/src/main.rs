use std::path::PathBuf;

use clap::Parser;
use pairsync::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "pairsync-cli")]
#[command(about = "Connect to every configured server and print paired entities")]
#[command(version)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Client config file (JSON)
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Reads tokens from `PAIRSYNC_TOKEN_<HANDLE>` environment variables.
struct EnvCredentials;

impl CredentialStore for EnvCredentials {
    async fn resolve(&self, credential: &CredentialRef) -> Result<String, ConnectError> {
        let var = format!(
            "PAIRSYNC_TOKEN_{}",
            credential.as_str().to_uppercase().replace('-', "_")
        );
        std::env::var(&var).map_err(|_| ConnectError::Credential(credential.to_string()))
    }
}

/// Prints rendered state instead of applying it.
struct PrintPipeline;

impl RenderPipeline for PrintPipeline {
    fn apply_state(&self, name_hash: &NameHash, payload: &[u8]) -> Result<(), RenderError> {
        println!("render {name_hash}: {}", String::from_utf8_lossy(payload));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    pairsync::logging::init(cli.verbose);

    let config = ClientConfig::load(&cli.config)?;
    let ctx = SessionContext::new(WebSocketConnector, EnvCredentials)
        .with_pipeline(PrintPipeline)
        .with_notifier(pairsync::session::TracingNotifier);

    let mut pairs = PairRegistry::from_config(config, ctx)?;
    for server in pairs.servers() {
        println!(
            "{} {} priority={} protocol={}{}",
            server.index,
            server.name,
            server.priority,
            server.kind.version,
            if server.enabled { "" } else { " (disabled)" }
        );
    }

    pairs.connect_all().await;
    println!("connecting; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    for pair in pairs.pairs() {
        println!("{} via {} as {}", pair.name_hash, pair.server, pair.uid);
    }
    for server in pairs.servers() {
        let status = pairs.status(server.index)?;
        match status.last_error {
            Some(error) => println!("{} {}: {error}", server.index, status.state),
            None => println!("{} {}", server.index, status.state),
        }
    }

    pairs.disconnect_all().await;
    tracing::info!("shut down");
    Ok(())
}
