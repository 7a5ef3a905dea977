//! In-memory [`Master`] used by the demo binary and integration tests.
//!
//! Each simulated drive's reported state is a stateless function of the last control word
//! written to it: whatever state that control word's bits imply per CiA-402 is what the drive
//! reports on the next read, the same tick the control word lands (matching S2, where holding
//! the ultimate target's control word steady drives the simulated fleet straight to that target
//! rather than one hop at a time).

use crate::bundle::AttrValue;
use crate::cia402::{self, ControlWord, Ds402State};
use crate::drive::DriveAddress;
use crate::master::{DiscoveredDrive, Master, MasterError};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct SimDrive {
    vendor_id: u32,
    product_code: u32,
    revision: u32,
    state: Ds402State,
    error_code: u32,
    mode_fb: i8,
    /// When set, the drive never progresses regardless of the control word it receives — used
    /// to exercise goal-reached timeouts.
    stuck: bool,
}

/// A drive to register with [`SimMaster`] before the first `scan()`, mirroring the
/// `sim_device_data` configuration input (§6).
#[derive(Debug, Clone, Copy)]
pub struct SimDeviceData {
    pub address: DriveAddress,
    pub vendor_id: u32,
    pub product_code: u32,
    pub revision: u32,
}

#[derive(Debug, Default)]
pub struct SimMaster {
    drives: HashMap<DriveAddress, SimDrive>,
}

impl SimMaster {
    pub fn new(devices: impl IntoIterator<Item = SimDeviceData>) -> Self {
        let mut drives = HashMap::new();
        for d in devices {
            drives.insert(
                d.address,
                SimDrive {
                    vendor_id: d.vendor_id,
                    product_code: d.product_code,
                    revision: d.revision,
                    state: Ds402State::SwitchOnDisabled,
                    error_code: 0,
                    mode_fb: 0,
                    stuck: false,
                },
            );
        }
        Self { drives }
    }

    /// Inject a non-zero error code on a drive, as if the drive itself reported it. Also forces
    /// the drive's decoded state to FAULT, matching a real amplifier tripping into fault the
    /// same cycle it latches an error code.
    pub fn inject_error(&mut self, addr: DriveAddress, error_code: u32) {
        if let Some(drive) = self.drives.get_mut(&addr) {
            drive.error_code = error_code;
            if error_code != 0 {
                drive.state = Ds402State::Fault;
            }
        }
    }

    pub fn stick(&mut self, addr: DriveAddress) {
        if let Some(drive) = self.drives.get_mut(&addr) {
            drive.stuck = true;
        }
    }

    fn require(&mut self, addr: DriveAddress) -> Result<&mut SimDrive, MasterError> {
        self.drives
            .get_mut(&addr)
            .ok_or_else(|| MasterError(format!("no simulated drive at {}", addr.addr_slug())))
    }
}

impl Master for SimMaster {
    fn scan(&mut self) -> Result<Vec<DiscoveredDrive>, MasterError> {
        Ok(self
            .drives
            .iter()
            .map(|(addr, d)| DiscoveredDrive {
                address: *addr,
                vendor_id: d.vendor_id,
                product_code: d.product_code,
                revision: d.revision,
            })
            .collect())
    }

    fn sdo_read(&mut self, addr: DriveAddress, _index: u16, _subindex: u8) -> Result<AttrValue, MasterError> {
        self.require(addr)?;
        Ok(AttrValue::U32(0))
    }

    fn sdo_write(
        &mut self,
        addr: DriveAddress,
        _index: u16,
        _subindex: u8,
        _value: AttrValue,
    ) -> Result<(), MasterError> {
        self.require(addr)?;
        Ok(())
    }

    fn pdo_read(&mut self, addr: DriveAddress, key: &str) -> Result<AttrValue, MasterError> {
        let drive = self.require(addr)?;
        match key {
            "status_word" => Ok(AttrValue::U16(cia402::encode_state(drive.state))),
            "error_code" => Ok(AttrValue::U32(drive.error_code)),
            "mode_fb" => Ok(AttrValue::I8(drive.mode_fb)),
            other => Err(MasterError(format!("unknown pdo key {other:?}"))),
        }
    }

    fn pdo_write(&mut self, addr: DriveAddress, key: &str, value: AttrValue) -> Result<(), MasterError> {
        let drive = self.require(addr)?;
        match key {
            "control_word" => {
                if !drive.stuck {
                    let cw = ControlWord::from_bits_truncate(value.as_u16());
                    if cw.contains(ControlWord::FAULT_RESET) && drive.state == Ds402State::Fault {
                        drive.error_code = 0;
                    }
                    drive.state = next_sim_state(drive.state, cw);
                }
                Ok(())
            }
            "mode_cmd" => {
                drive.mode_fb = value.as_i8();
                Ok(())
            }
            other => Err(MasterError(format!("unknown pdo key {other:?}"))),
        }
    }
}

/// Given the drive's current state and the control word it was just written, compute the state
/// it reports on the next read. Stateless aside from the fault-reset and quick-stop-active edges:
/// the result depends only on `cw`'s bits (and, for those two cases, on `state`), not on how many
/// ticks `cw` has been held.
fn next_sim_state(state: Ds402State, cw: ControlWord) -> Ds402State {
    if cw.contains(ControlWord::FAULT_RESET) && state == Ds402State::Fault {
        return Ds402State::SwitchOnDisabled;
    }
    if !cw.contains(ControlWord::ENABLE_VOLTAGE) {
        return Ds402State::SwitchOnDisabled;
    }
    if !cw.contains(ControlWord::QUICK_STOP) {
        return match state {
            Ds402State::OperationEnabled | Ds402State::QuickStopActive => Ds402State::QuickStopActive,
            _ => Ds402State::ReadyToSwitchOn,
        };
    }
    if !cw.contains(ControlWord::SWITCH_ON) {
        return Ds402State::ReadyToSwitchOn;
    }
    if !cw.contains(ControlWord::ENABLE_OPERATION) {
        return Ds402State::SwitchedOn;
    }
    Ds402State::OperationEnabled
}
