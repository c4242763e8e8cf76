//! Engine modules: the pure logic that turns a `Configuration` into an
//! ordered provisioning plan.
//!
//! Nothing in here touches the system. The executor runs what the engine
//! produces.

pub mod chroot_script;
pub mod partition;
pub mod plan;
pub mod shell;

pub use partition::{partition_path, PartitionLayout, PartitionSpec};
pub use plan::{build_plan, Phase, Probe, ProvisioningPlan, ProvisioningStep, StepAction, Target};
