//! C4 — the Drive Adapter: binds the pure CiA-402 state machine to concrete bus I/O.
//!
//! One [`DriveAdapter`] exists per physical drive discovered at startup. It owns its own
//! [`InterfaceBundle`]s and is the only thing in this crate that both calls into
//! [`crate::cia402`] and talks to a [`Master`].

use crate::bundle::{AttrValue, DataType, InterfaceBundle};
use crate::cia402::{self, Ds402State};
use crate::error_catalog::ErrorCatalog;
use crate::master::{Master, MasterError};
use crate::supervisor::merge_device_descriptions;
use std::fmt;
use std::sync::Arc;

/// `(bus_index, alias, position)` — a drive's fixed location on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriveAddress {
    pub bus_index: u16,
    pub alias: u16,
    pub position: u16,
}

impl DriveAddress {
    pub fn new(bus_index: u16, alias: u16, position: u16) -> Self {
        Self {
            bus_index,
            alias,
            position,
        }
    }

    /// Deterministic string derivation used as a prefix disambiguating this drive's attributes
    /// inside the supervisor's aggregated bundle, e.g. `d0_1_3`.
    pub fn addr_slug(&self) -> String {
        format!("d{}_{}_{}", self.bus_index, self.alias, self.position)
    }
}

impl fmt::Display for DriveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr_slug())
    }
}

/// CiA-402 modes of operation a [`DriveModel`] may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVariant {
    /// Cyclic synchronous position.
    Csp,
    /// Cyclic synchronous velocity.
    Csv,
    /// Homing mode.
    Hm,
}

/// A per-model deviation from the standard CiA-402 status-word bit layout.
///
/// Quirks only ever adjust informational feedback; [`cia402::decode_state`] never takes a quirk
/// parameter, so a quirk can never change which [`Ds402State`] a status word decodes to (see
/// DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusWordQuirk {
    /// Standard CiA-402 layout, no deviation.
    None,
    /// Bit 15 reports "home found" rather than being reserved, observed on some drives.
    Bit15HomeFound,
}

/// `(vendor_id, product_code, revision)` plus the profile/catalog/quirk data every drive of this
/// model shares.
#[derive(Debug, Clone)]
pub struct DriveModel {
    pub vendor_id: u32,
    pub product_code: u32,
    pub revision: u32,
    pub model_id: String,
    pub profile: ProfileVariant,
    pub quirk: StatusWordQuirk,
    /// Set for drives synthesized from `sim_device_data` rather than discovered on a real bus.
    pub sim: bool,
}

/// Per-drive feedback, as produced by [`DriveAdapter::get_feedback`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriveFeedback {
    pub status_word: u16,
    pub error_code: u32,
    pub state: Ds402State,
    pub operational: bool,
    pub goal_reached: bool,
    pub goal_reason: String,
    pub fault: bool,
    pub fault_desc: String,
    pub description: String,
    pub advice: String,
    pub mode_fb: i8,
}

/// Per-drive command, as produced by [`DriveAdapter::set_command`] and flushed by
/// [`DriveAdapter::write`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub control_word: u16,
    pub state: Ds402State,
    pub mode_cmd: i8,
}

/// Binds [`crate::cia402`]'s pure logic to a specific drive's bus address and error catalog.
pub struct DriveAdapter {
    address: DriveAddress,
    addr_slug: String,
    model: DriveModel,
    catalog: Arc<ErrorCatalog>,
    feedback_in: InterfaceBundle,
    command_in: InterfaceBundle,
    target_state: Ds402State,
    mode_cmd: i8,
    reset: bool,
    control_word: u16,
}

impl DriveAdapter {
    pub fn new(address: DriveAddress, model: DriveModel, catalog: Arc<ErrorCatalog>) -> Self {
        let mut feedback_in = InterfaceBundle::new();
        feedback_in.declare("status_word", 0u16, DataType::U16);
        feedback_in.declare("error_code", 0u32, DataType::U32);
        feedback_in.declare("mode_fb", 0i8, DataType::I8);
        feedback_in.freeze();

        let mut command_in = InterfaceBundle::new();
        command_in.declare("mode_cmd", 0i8, DataType::I8);
        command_in.declare("reset", false, DataType::Bit);
        command_in.freeze();

        Self {
            addr_slug: address.addr_slug(),
            address,
            model,
            catalog,
            feedback_in,
            command_in,
            target_state: Ds402State::SwitchOnDisabled,
            mode_cmd: 0,
            reset: false,
            control_word: 0,
        }
    }

    pub fn address(&self) -> DriveAddress {
        self.address
    }

    pub fn addr_slug(&self) -> &str {
        &self.addr_slug
    }

    pub fn model(&self) -> &DriveModel {
        &self.model
    }

    /// Pull `status_word`, `error_code` and mode feedback from the external master. Must not
    /// block longer than one tick budget; real-world blocking is entirely inside `master`'s
    /// implementation, out of this crate's control.
    pub fn read(&mut self, master: &mut dyn Master) -> Result<(), MasterError> {
        let status_word = master.pdo_read(self.address, "status_word")?.as_u16();
        let error_code = master.pdo_read(self.address, "error_code")?.as_u32();
        let mode_fb = master.pdo_read(self.address, "mode_fb")?.as_i8();
        self.feedback_in.update([
            ("status_word", AttrValue::U16(status_word)),
            ("error_code", AttrValue::U32(error_code)),
            ("mode_fb", AttrValue::I8(mode_fb)),
        ]);
        Ok(())
    }

    /// Decode this tick's feedback. I/O failures never surface here — `read` already returned
    /// before this is called, so by the time `get_feedback` runs the bundle always holds a
    /// complete, valid snapshot.
    pub fn get_feedback(&mut self) -> DriveFeedback {
        let status_word = self.feedback_in.get("status_word").as_u16();
        let error_code = self.feedback_in.get("error_code").as_u32();
        let mode_fb = self.feedback_in.get("mode_fb").as_i8();
        let state = cia402::decode_state(status_word);

        let entry = (error_code != 0).then(|| self.catalog.lookup(error_code));
        let description = entry
            .as_ref()
            .map(|e| e.description.clone())
            .unwrap_or_else(|| "No error".to_string());
        let advice = entry.as_ref().map(|e| e.advice.clone()).unwrap_or_default();

        let fault =
            matches!(state, Ds402State::Fault | Ds402State::FaultReactionActive) || error_code != 0;
        let fault_desc = if fault {
            let desc = entry
                .map(|e| e.description)
                .unwrap_or_else(|| "Drive fault".to_string());
            merge_device_descriptions([(self.addr_slug.as_str(), desc.as_str())])
        } else {
            String::new()
        };

        if self.feedback_in.rising_edge("error_code") {
            log::error!("{}: error code {error_code} ({description})", self.addr_slug);
        }

        let goal_reached = cia402::reached_goal(state, self.target_state);
        let goal_reason = if goal_reached {
            String::new()
        } else {
            format!("Waiting: at {state}, target {}", self.target_state)
        };

        // A drive is "operational" once it has left the transient post-power-up NOT READY TO
        // SWITCH ON state and is actively participating in the CiA-402 handshake.
        let operational = !matches!(state, Ds402State::NotReadyToSwitchOn);

        DriveFeedback {
            status_word,
            error_code,
            state,
            operational,
            goal_reached,
            goal_reason,
            fault,
            fault_desc,
            description,
            advice,
            mode_fb,
        }
    }

    /// Record the commanded target; the control word is computed lazily from the last-read
    /// status word and flushed on the next [`write`](Self::write).
    pub fn set_command(&mut self, target_state: Ds402State, mode_cmd: i8, reset: bool) {
        self.target_state = target_state;
        self.mode_cmd = mode_cmd;
        self.reset = reset;
        self.command_in.update([
            ("mode_cmd", AttrValue::I8(mode_cmd)),
            ("reset", AttrValue::Bit(reset)),
        ]);
        let current = cia402::decode_state(self.feedback_in.get("status_word").as_u16());
        self.control_word = cia402::next_control_word(current, target_state, reset);
    }

    /// The control word and mode command [`set_command`](Self::set_command) computed, as last
    /// staged for [`write`](Self::write).
    pub fn command(&self) -> DriveCommand {
        DriveCommand {
            control_word: self.control_word,
            state: self.target_state,
            mode_cmd: self.mode_cmd,
        }
    }

    /// Flush the staged control word and mode command to the external master.
    pub fn write(&mut self, master: &mut dyn Master) -> Result<(), MasterError> {
        master.pdo_write(self.address, "control_word", AttrValue::U16(self.control_word))?;
        master.pdo_write(self.address, "mode_cmd", AttrValue::I8(self.mode_cmd))?;
        Ok(())
    }

    /// Advance this drive's interface bundles past the tick boundary. Must be called exactly
    /// once per tick, after [`write`](Self::write).
    pub fn advance(&mut self) {
        self.feedback_in.advance();
        self.command_in.advance();
    }
}
