//! archprov library
//!
//! Collects an installation configuration through a terminal wizard and
//! provisions Arch Linux onto a target disk by running an ordered plan of
//! external commands.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod command_runner;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod hardware;
pub mod input;
pub mod process_guard;
pub mod report;
pub mod theme;
pub mod types;
pub mod ui;
pub mod wizard;
pub mod worker;

// Re-export main types for convenience
pub use catalog::{SoftwareCatalog, SoftwareEntry};
pub use command_runner::{CommandRunner, DryRunRunner, SystemRunner};
pub use config::{Configuration, ConfigurationDraft, SshSettings};
pub use engine::{build_plan, PartitionLayout, ProvisioningPlan, ProvisioningStep, Target};
pub use error::{ProvisionError, Result};
pub use executor::{CancelToken, RunEvent, StepExecutor};
pub use hardware::{FirmwareMode, HostInfo};
pub use process_guard::{CommandProcessGroup, ProcessGuard};
pub use report::{RunReport, RunStatus, StepOutcome, StepRecord};
pub use types::{BootloaderTarget, ExecutionContext, Filesystem, PartitionTable, PartitionType, Toggle};
pub use wizard::{ConfigurationWizard, WizardInput, WizardOutcome, WizardState};
pub use worker::{spawn_run, RunHandle};
