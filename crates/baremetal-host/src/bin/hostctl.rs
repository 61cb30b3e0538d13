//! hostctl - inspect and exercise the bare metal host engine.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use baremetal_host::bmc::{self, Credentials};
use baremetal_host::controller::{InMemorySecretStore, Reconciler};
use baremetal_host::inspection::{get_hardware_details, IntrospectionData};
use baremetal_host::profile;
use baremetal_host::provisioner::demo::DemoProvisionerFactory;
use baremetal_host::{EngineConfig, Host};

/// Inspect and exercise the bare metal host engine.
#[derive(Parser)]
#[command(name = "hostctl")]
#[command(about = "Bare metal host lifecycle tooling")]
struct Cli {
    /// Engine configuration file (YAML).
    #[arg(long, env = "HOSTCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported BMC address schemes.
    Drivers,

    /// List the hardware profiles.
    Profiles,

    /// Resolve a BMC address and print the driver parameters.
    Access {
        /// BMC address, e.g. `ibmc://10.0.0.5/redfish`.
        #[arg(long)]
        address: String,

        /// Skip TLS certificate verification.
        #[arg(long, default_value = "false")]
        insecure: bool,
    },

    /// Normalize a raw introspection payload (JSON) and print it as YAML.
    Normalize {
        /// Path to the introspection data.
        #[arg(long)]
        data: PathBuf,
    },

    /// Run reconciliation passes for a host using the demo backend.
    Reconcile {
        /// Path to the host manifest (YAML).
        #[arg(long)]
        host: PathBuf,

        /// Number of passes to run.
        #[arg(long, default_value = "10")]
        passes: u32,

        /// BMC username stored for the host's credentials secret.
        #[arg(long, default_value = "admin")]
        username: String,

        /// BMC password stored for the host's credentials secret.
        #[arg(long, env = "HOSTCTL_BMC_PASSWORD", default_value = "password")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("Config path is not valid UTF-8")?;
            EngineConfig::from_file(path)?
        }
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Drivers => {
            for scheme in bmc::registry().schemes() {
                println!("{scheme}");
            }
        }

        Commands::Profiles => {
            println!("\n{:<12} {:<12} {:<10}", "NAME", "DEVICE", "HCTL");
            println!("{}", "-".repeat(36));
            for profile in profile::profiles() {
                println!(
                    "{:<12} {:<12} {:<10}",
                    profile.name,
                    profile.root_device_hints.device_name,
                    profile.root_device_hints.hctl
                );
            }
        }

        Commands::Access { address, insecure } => {
            let details = bmc::new_access_details(&address, insecure)
                .with_context(|| format!("Failed to resolve BMC address {address}"))?;

            println!("Type:        {}", details.bmc_type());
            println!("Driver:      {}", details.driver());
            println!("Needs MAC:   {}", details.needs_mac());
            println!("Boot:        {}", details.boot_interface());
            println!("Management:  {}", details.management_interface());
            println!("Power:       {}", details.power_interface());
            println!("RAID:        {}", details.raid_interface());
            println!("Vendor:      {}", details.vendor_interface());

            let placeholder = Credentials::new("<username>", "<password>");
            let driver_info = details.driver_info(&placeholder);
            println!(
                "{}",
                serde_json::to_string_pretty(&driver_info)
                    .context("Failed to render driver info")?
            );
        }

        Commands::Normalize { data } => {
            let raw = std::fs::read_to_string(&data)
                .with_context(|| format!("Failed to read {}", data.display()))?;
            let payload: IntrospectionData =
                serde_json::from_str(&raw).context("Failed to parse introspection data")?;
            let details = get_hardware_details(&payload);
            print!(
                "{}",
                serde_yaml::to_string(&details).context("Failed to render hardware details")?
            );
        }

        Commands::Reconcile {
            host,
            passes,
            username,
            password,
        } => {
            let raw = std::fs::read_to_string(&host)
                .with_context(|| format!("Failed to read {}", host.display()))?;
            let mut host: Host =
                serde_yaml::from_str(&raw).context("Failed to parse host manifest")?;

            let secrets = Arc::new(InMemorySecretStore::new());
            if !host.spec.bmc.credentials_name.is_empty() {
                secrets.insert(
                    &host.metadata.namespace,
                    &host.spec.bmc.credentials_name,
                    Credentials::new(username, password),
                );
            }

            let reconciler = Reconciler::new(
                config,
                bmc::registry(),
                Arc::new(DemoProvisionerFactory),
                secrets,
            );

            for pass in 1..=passes {
                let before = host.state();
                let outcome = reconciler
                    .reconcile(&mut host)
                    .await
                    .with_context(|| format!("Pass {pass} failed"))?;

                info!(
                    pass,
                    from = %before,
                    to = %host.state(),
                    requeue_after = ?outcome.requeue_after,
                    "pass complete"
                );
                for event in &outcome.info.events {
                    println!("  event {}: {}", event.reason, event.message);
                }
                println!(
                    "pass {pass:>3}: {:<24} -> {:<24} {}",
                    display_state(before.as_str()),
                    display_state(host.state().as_str()),
                    host.status.error_message
                );

                if outcome.ready_for_removal {
                    println!("host is ready to be removed");
                    break;
                }
                if outcome.requeue_after.is_none() {
                    println!("waiting for a change");
                    break;
                }
            }

            print!(
                "{}",
                serde_yaml::to_string(&host.status).context("Failed to render host status")?
            );
        }
    }

    Ok(())
}

fn display_state(state: &str) -> &str {
    if state.is_empty() {
        "<none>"
    } else {
        state
    }
}
