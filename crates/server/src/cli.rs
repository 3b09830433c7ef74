//! CLI argument parsing and subcommand dispatch.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use pillars_core::Config;
use pillars_rules::schema::RuleHit;
use pillars_rules::RuleEngine;
use pillars_store::PgSource;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Taxonomy dashboard backend with the warning-rule engine.
#[derive(Parser, Debug)]
#[command(name = "pillars", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API (default).
    Serve {
        /// Bind address; overrides HOST.
        #[arg(long, env = "PILLARS_HOST")]
        host: Option<String>,

        /// Bind port; overrides PORT.
        #[arg(long, env = "PILLARS_PORT")]
        port: Option<u16>,
    },

    /// Apply pending database migrations and exit.
    Migrate,

    /// Evaluate all warning rules for one user and data source.
    Evaluate {
        #[arg(long)]
        user: String,

        #[arg(long = "data-source")]
        data_source: String,

        /// Print hits as JSON instead of one line per hit.
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(cli: Cli, mut config: Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Migrate => {
            let pool = pillars_store::init_pg_pool(&config.postgres).await?;
            pool.close().await;
            Ok(())
        }
        Command::Evaluate {
            user,
            data_source,
            json,
        } => {
            let pool = pillars_store::connect_lazy(&config.postgres)?;
            let engine = RuleEngine::new(PgSource::new(pool));
            let hits = engine.evaluate(&user, &data_source).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_hits(&hits);
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.log_summary();

    let pool = pillars_store::init_pg_pool(&config.postgres).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, pool));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("API docs at http://{}/docs", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

fn hit_line(hit: &RuleHit) -> String {
    format!("[{}] {}: {}", hit.severity, hit.name, hit.message)
}

fn print_hits(hits: &[RuleHit]) {
    if hits.is_empty() {
        println!("No warnings.");
        return;
    }
    for hit in hits {
        println!("{}", hit_line(hit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pillars_rules::schema::Severity;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["pillars"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn evaluate_args_parse() {
        let cli = Cli::try_parse_from([
            "pillars",
            "evaluate",
            "--user",
            "alice",
            "--data-source",
            "Salesforce API",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Evaluate {
                user,
                data_source,
                json,
            }) => {
                assert_eq!(user, "alice");
                assert_eq!(data_source, "Salesforce API");
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn evaluate_requires_user() {
        assert!(Cli::try_parse_from(["pillars", "evaluate", "--data-source", "x"]).is_err());
    }

    #[test]
    fn hit_line_format() {
        let hit = RuleHit {
            rule_id: 7,
            name: "PII".into(),
            severity: Severity::Error,
            message: "Mask it".into(),
        };
        assert_eq!(hit_line(&hit), "[Error] PII: Mask it");
    }
}
