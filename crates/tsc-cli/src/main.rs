use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tsc_audit::ChainStatus;
use tsc_config::{known_profiles, resolve_profile};

mod commands;

#[derive(Parser)]
#[command(name = "tsc")]
#[command(about = "Token setup controller", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every address in the layered config. No ledger access.
    Validate {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> network -> operator overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the network profile a ledger id resolves to
    Profile {
        /// Network id as the ledger reports it. Omit to list known profiles.
        #[arg(long)]
        network_id: Option<u64>,
    },

    /// Reconcile a ledger state file against the target configuration
    Reconcile {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Simulated ledger state (JSON)
        #[arg(long)]
        ledger_state: String,

        /// Write the converged state back to --ledger-state
        #[arg(long, default_value_t = false)]
        write_state: bool,

        /// Append the run to <audit-dir>/journal.jsonl
        #[arg(long)]
        audit_dir: Option<String>,

        /// Skip the primary-network pause before the first mutation
        #[arg(long, default_value_t = false)]
        no_safety_delay: bool,
    },

    /// Audit journal utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of a journal file
    Verify {
        #[arg(long)]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Validate { config_paths } => commands::validate(&config_paths)?,

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = tsc_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Profile { network_id } => {
            let profiles = match network_id {
                Some(id) => vec![resolve_profile(id)],
                None => known_profiles(),
            };
            for p in profiles {
                commands::print_profile(&p);
            }
        }

        Commands::Reconcile {
            config_paths,
            ledger_state,
            write_state,
            audit_dir,
            no_safety_delay,
        } => {
            commands::reconcile::run(commands::reconcile::ReconcileArgs {
                config_paths,
                ledger_state,
                write_state,
                audit_dir,
                honor_safety_delay: !no_safety_delay,
            })
            .await?
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => {
                let status = tsc_audit::verify_chain(&path)
                    .with_context(|| format!("verify journal failed: {path}"))?;
                match status {
                    ChainStatus::Intact { entries } => {
                        println!("chain=INTACT entries={entries} path={path}");
                    }
                    ChainStatus::Broken { line, reason } => {
                        println!("chain=BROKEN line={line} path={path}");
                        anyhow::bail!("journal chain broken at line {line}: {reason}");
                    }
                }
            }
        },
    }

    Ok(())
}

/// Logs go to stderr; stdout carries the key=value report.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
