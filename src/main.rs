use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use rust_attachments::config::AppConfig;
use rust_attachments::services::worker::BackgroundWorker;
use rust_attachments::{AppState, OwnerLifecycle, OwnerRef, RemovalKind, TypeFilter, UploadPayload};
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct OwnerArgs {
    /// Owner kind, e.g. "User"
    #[arg(long)]
    kind: String,

    /// Owner primary key
    #[arg(long)]
    id: String,
}

impl OwnerArgs {
    fn owner(&self) -> OwnerRef {
        OwnerRef::new(&self.kind, &self.id)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attach one or more files to an owner
    Attach {
        #[command(flatten)]
        owner: OwnerArgs,
        /// Type tag; omit for untyped attachments
        #[arg(short, long)]
        r#type: Option<String>,
        files: Vec<PathBuf>,
    },
    /// Put a file into an owner's (type) slot, replacing the current one
    Replace {
        #[command(flatten)]
        owner: OwnerArgs,
        #[arg(short, long)]
        r#type: Option<String>,
        file: PathBuf,
    },
    /// List an owner's attachments as JSON
    List {
        #[command(flatten)]
        owner: OwnerArgs,
        /// Restrict to these type tags
        #[arg(short, long)]
        r#type: Vec<String>,
        /// Only untyped attachments
        #[arg(long, conflicts_with = "type")]
        untyped: bool,
    },
    /// Delete a single attachment by id
    Delete { id: String },
    /// Signal that an owner was removed
    Purge {
        #[command(flatten)]
        owner: OwnerArgs,
        /// Soft removal keeps the attachments
        #[arg(long)]
        soft: bool,
    },
    /// Remove storage objects without a record
    Sweep {
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Run the periodic orphan sweep until interrupted
    Worker {
        #[arg(long, default_value_t = 3600)]
        interval_secs: u64,
        /// Only sweep objects under this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_attachments=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    info!(
        "🚀 Starting attachment tool [Disk: {}]",
        config.attachments.storage_disk
    );

    let state = AppState::build(config).await?;
    let service = state.attachments.clone();

    match args.command {
        Command::Attach {
            owner,
            r#type,
            files,
        } => {
            let owner = owner.owner();
            let mut payloads = Vec::with_capacity(files.len());
            for file in &files {
                payloads.push(UploadPayload::from_path(file).await?);
            }

            let outcome = service
                .attach_many(&owner, payloads, r#type.as_deref())
                .await;
            let views: Vec<_> = outcome.attached.iter().map(|a| service.render(a)).collect();
            println!("{}", serde_json::to_string_pretty(&views)?);

            for failure in &outcome.failures {
                tracing::error!("❌ {}: {}", failure.name, failure.error);
            }
            if !outcome.is_complete() {
                anyhow::bail!("{} of {} files failed", outcome.failures.len(), files.len());
            }
        }
        Command::Replace {
            owner,
            r#type,
            file,
        } => {
            let payload = UploadPayload::from_path(&file).await?;
            let attachment = service
                .replace(&owner.owner(), r#type.as_deref(), payload)
                .await?;
            println!("{}", serde_json::to_string_pretty(&service.render(&attachment))?);
        }
        Command::List {
            owner,
            r#type,
            untyped,
        } => {
            let filter = if untyped {
                TypeFilter::Untyped
            } else if r#type.is_empty() {
                TypeFilter::Any
            } else {
                TypeFilter::tags(&r#type)
            };

            let attachments = service.list_for(&owner.owner(), filter).await?;
            let views: Vec<_> = attachments.iter().map(|a| service.render(a)).collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        Command::Delete { id } => match service.find(&id).await? {
            Some(attachment) => {
                let deleted = service.delete(&attachment).await?;
                info!("Deleted {}: {}", id, deleted);
            }
            None => anyhow::bail!("Attachment {} not found", id),
        },
        Command::Purge { owner, soft } => {
            let removal = if soft {
                RemovalKind::Soft
            } else {
                RemovalKind::Permanent
            };
            let report = service.owner_removed(&owner.owner(), removal).await?;
            info!(
                "Removed {} attachments ({} failed)",
                report.deleted,
                report.failures.len()
            );
        }
        Command::Sweep { prefix } => {
            let report = state.sweeper().sweep(&prefix).await?;
            println!("{}", serde_json::to_string_pretty(&report.removed)?);
        }
        Command::Worker {
            interval_secs,
            prefix,
        } => {
            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            let worker = BackgroundWorker::new(
                state.sweeper(),
                std::time::Duration::from_secs(interval_secs),
                shutdown_rx,
            )
            .with_prefix(prefix);
            let handle = tokio::spawn(worker.run());
            info!("👷 Worker service initialized.");

            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
            let _ = handle.await;
        }
    }

    info!("👋 Done.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
