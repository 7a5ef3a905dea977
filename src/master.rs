//! The external EtherCAT master I/O boundary.
//!
//! Everything on the far side of this trait — PDU framing, mailbox protocol, SDO/PDO transport,
//! EEPROM/ESI parsing — is out of this crate's scope. [`Master`] is the only seam the cyclic
//! pipeline and drive adapters reach through to touch real hardware; a deployment supplies its own
//! implementation, and [`crate::sim_master::SimMaster`] stands in for testing and the demo binary.

use crate::bundle::AttrValue;
use crate::drive::DriveAddress;
use std::fmt;

/// A drive discovered by [`Master::scan`], before any [`crate::drive::DriveModel`] has been
/// matched to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveredDrive {
    pub address: DriveAddress,
    pub vendor_id: u32,
    pub product_code: u32,
    pub revision: u32,
}

/// An I/O failure reported by a [`Master`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterError(pub String);

impl fmt::Display for MasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MasterError {}

/// External collaborator performing the bus scan and SDO/PDO transport.
///
/// The cyclic pipeline only ever calls through this boundary from its `read`/`write` phases (see
/// [`crate::pipeline`]), never concurrently with itself and never from more than one thread.
pub trait Master {
    /// Enumerate drives currently present on the bus.
    fn scan(&mut self) -> Result<Vec<DiscoveredDrive>, MasterError>;

    /// Acyclic configuration read.
    fn sdo_read(&mut self, addr: DriveAddress, index: u16, subindex: u8) -> Result<AttrValue, MasterError>;

    /// Acyclic configuration write.
    fn sdo_write(
        &mut self,
        addr: DriveAddress,
        index: u16,
        subindex: u8,
        value: AttrValue,
    ) -> Result<(), MasterError>;

    /// Cyclic-domain read by mapped key (e.g. `"status_word"`, `"error_code"`, `"mode_fb"`).
    fn pdo_read(&mut self, addr: DriveAddress, key: &str) -> Result<AttrValue, MasterError>;

    /// Cyclic-domain write by mapped key (e.g. `"control_word"`, `"mode_cmd"`).
    fn pdo_write(&mut self, addr: DriveAddress, key: &str, value: AttrValue) -> Result<(), MasterError>;
}
