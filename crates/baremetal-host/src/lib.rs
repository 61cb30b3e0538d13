//! Bare metal host lifecycle engine.
//!
//! Hosts move through a fixed set of provisioning states: registration with
//! a BMC, hardware inspection, profile matching, image provisioning and
//! teardown. Each [`Reconciler::reconcile`] call runs one pass of the state
//! machine for one host and tells the caller when to run it again.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use baremetal_host::bmc;
//! use baremetal_host::controller::{InMemorySecretStore, Reconciler};
//! use baremetal_host::provisioner::demo::DemoProvisionerFactory;
//! use baremetal_host::{Credentials, EngineConfig, Host};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let secrets = Arc::new(InMemorySecretStore::new());
//!     secrets.insert("metal", "node-0-bmc", Credentials::new("admin", "password"));
//!
//!     let reconciler = Reconciler::new(
//!         EngineConfig::default(),
//!         bmc::registry(),
//!         Arc::new(DemoProvisionerFactory),
//!         secrets,
//!     );
//!
//!     let mut host: Host = serde_yaml::from_str(&std::fs::read_to_string("node-0.yaml")?)?;
//!     let outcome = reconciler.reconcile(&mut host).await?;
//!     println!("{} (requeue after {:?})", host.state(), outcome.requeue_after);
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bmc;
pub mod config;
pub mod controller;
pub mod error;
pub mod host;
pub mod inspection;
pub mod profile;
pub mod provisioner;

pub use bmc::{AccessDetails, BmcError, Credentials, DriverRegistry};
pub use config::EngineConfig;
pub use controller::{ActionResult, ReconcileInfo, ReconcileOutcome, Reconciler};
pub use error::{ReconcileError, Result};
pub use host::{ErrorType, HardwareDetails, Host, ProvisioningState};
pub use inspection::{get_hardware_details, IntrospectionData};
pub use profile::{get_profile, Profile, ProfileError};
pub use provisioner::{ProvisionResult, Provisioner, ProvisionerError, ProvisionerFactory};
