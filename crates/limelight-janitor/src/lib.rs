//! Janitor for orphaned limelight worker containers.
//!
//! Provisioning failures leak containers that no routing flow will ever
//! reclaim. The sweep lists the fleet, pings each container's health
//! path, and deletes the ones that no longer answer. It runs on an
//! external schedule; one invocation is one pass.

pub mod fleet;
pub mod rest;
pub mod sweep;

pub use fleet::{ContainerApp, ContainerFleet, CredentialSource, FleetError, FleetProvider, StaticCredential};
pub use rest::{RestFleet, RestFleetProvider};
pub use sweep::{JanitorSweep, SweepReport};
