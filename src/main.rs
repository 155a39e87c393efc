use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use aura_lifecycle::auth::{Credentials, TokenManager};
use aura_lifecycle::cli::{self, Commands};
use aura_lifecycle::client::AuraClient;
use aura_lifecycle::config::{self, Config};
use aura_lifecycle::lifecycle::{Lifecycle, LifecycleSettings, WaitOutcome};
use aura_lifecycle::models::InstanceTemplate;
use aura_lifecycle::transport::Transport;

#[tokio::main]
async fn main() -> ExitCode {
    // `--help` and usage errors must not depend on the environment.
    let args = cli::Cli::parse();

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&cfg);

    let result = run(cfg, args.command).await;
    ExitCode::from(exit_status(&result))
}

/// Reports a failed run exactly once, through the log, and maps it to a
/// process exit status.
fn exit_status(result: &anyhow::Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    }
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing(cfg: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "aura_lifecycle=info,aura=info".into()),
    );
    let fmt_layer = if cfg.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

async fn run(cfg: Config, command: Commands) -> anyhow::Result<()> {
    let transport = Transport::new(cfg.http_timeout, cfg.retry.clone())?;

    let auth = command.auth();
    let tokens = TokenManager::new(
        Credentials::new(&cfg.auth_url, &auth.client_id, &auth.client_secret),
        transport.clone(),
    );
    let client = AuraClient::new(&cfg.api_url, &auth.tenant_id, transport, tokens);
    client
        .ensure_valid_token()
        .await
        .context("could not obtain an API token")?;

    let mut settings = LifecycleSettings {
        poll_interval: cfg.poll_interval,
        ready_timeout: cfg.ready_timeout,
        template: InstanceTemplate::default(),
    };

    match command {
        Commands::Configure {
            region,
            cloud_provider,
            name,
            version,
            memory,
            instance_type,
            timeout,
            ..
        } => {
            settings.template = InstanceTemplate {
                name,
                version,
                memory,
                instance_type,
            };
            if let Some(secs) = timeout {
                settings.ready_timeout = Duration::from_secs(secs);
            }

            let lifecycle = Lifecycle::new(client, settings);
            let configured = lifecycle
                .configure(&region, &cloud_provider)
                .await
                .context("instance configuration failed")?;

            match &configured.outcome {
                WaitOutcome::Ready { .. } => {
                    print!("\n{}\n", configured.env_lines());
                    Ok(())
                }
                WaitOutcome::TimedOut { last, polls } => anyhow::bail!(
                    "instance {} did not reach running within {:?} (last status: {}, {} polls); \
                     run `aura delete --instance-id {}` to clean it up",
                    configured.credentials.id,
                    lifecycle.settings().ready_timeout,
                    last,
                    polls,
                    configured.credentials.id
                ),
            }
        }
        Commands::Delete { instance_id, .. } => {
            let lifecycle = Lifecycle::new(client, settings);
            match lifecycle.teardown(&instance_id).await? {
                Some(deleted) => {
                    tracing::info!(instance_id = %deleted.id, status = %deleted.status, "Instance deleted");
                    println!("{}", deleted.id);
                }
                None => tracing::info!(instance_id = %instance_id, "Nothing to delete"),
            }
            Ok(())
        }
        Commands::Status { instance_id, .. } => {
            let lifecycle = Lifecycle::new(client, settings);
            let status = lifecycle.status(&instance_id).await?;
            println!("{}", status);
            Ok(())
        }
    }
}
