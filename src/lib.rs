//! A CiA-402 drive fleet supervisor.
//!
//! Three tightly coupled pieces, leaves first:
//!
//! - [`cia402`] — the pure per-drive CiA-402 profile state machine (status word in, control word
//!   out; no I/O).
//! - [`drive`] and [`supervisor`] — [`drive::DriveAdapter`] binds the pure state machine to one
//!   physical drive's bus address and error catalog; [`supervisor::Supervisor`] owns every adapter
//!   and coordinates the fleet toward an operator-requested goal (INIT, STOP, START, FAULT).
//! - [`pipeline`] — the fixed-rate read/feedback/command/write loop binding the two state machines
//!   to an external [`master::Master`] under exception containment.
//!
//! [`bundle`] and [`error_catalog`] are the shared low-level building blocks ([`bundle`]'s
//! change-aware key/value store underlies every feedback/command surface; [`error_catalog`]'s
//! lazy, model-indexed lookup backs every drive's error reporting). [`config`] carries the
//! already-parsed tuning knobs and per-model device configuration; this crate never reads a config
//! file itself. [`master`] specifies the only boundary crossed into real (or simulated, via
//! [`sim_master`]) hardware.

pub mod bundle;
pub mod cia402;
pub mod config;
pub mod drive;
pub mod error_catalog;
pub mod master;
pub mod pipeline;
pub mod sim_master;
pub mod supervisor;

pub use bundle::{AttrValue, DataType, InterfaceBundle};
pub use cia402::{Ds402State, decode_state, encode_state, next_control_word, reached_goal};
pub use config::{DeviceConfigEntry, DeviceConfigRegistry, McrConfig};
pub use drive::{DriveAddress, DriveAdapter, DriveCommand, DriveFeedback, DriveModel, ProfileVariant, StatusWordQuirk};
pub use error_catalog::{ErrorCatalog, ErrorCatalogRegistry, ErrorCatalogSource, ErrorEntry};
pub use master::{DiscoveredDrive, Master, MasterError};
pub use pipeline::Pipeline;
pub use supervisor::{StateTag, Supervisor, SupervisorState};
