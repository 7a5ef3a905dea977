//! C5 — the Supervisor state machine: coordinates every drive toward an operator-requested
//! fleet-level goal (INIT, STOP, START, FAULT), arbitrating faults and goal-reached timeouts.
//!
//! The dynamic FSM library the source used (runtime-registered event graph, `on_before_*` /
//! `on_enter_*` hooks) is replaced here by a plain match over [`SupervisorState`] and a set of
//! guard methods returning `bool` — exactly the redesign direction called for when the transition
//! table is static and known at compile time.

use crate::bundle::{AttrValue, DataType, InterfaceBundle};
use crate::cia402::Ds402State;
use crate::config::{DeviceConfigRegistry, McrConfig};
use crate::drive::{DriveAdapter, DriveFeedback};
use crate::master::{Master, MasterError};
use std::fmt;

/// External command encoding (exit codes from the operator interface).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTag {
    Init = 0,
    Stop = 1,
    Start = 2,
    Fault = 4,
}

impl StateTag {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(StateTag::Init),
            1 => Some(StateTag::Stop),
            2 => Some(StateTag::Start),
            4 => Some(StateTag::Fault),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateTag::Init => "INIT",
            StateTag::Stop => "STOP",
            StateTag::Start => "START",
            StateTag::Fault => "FAULT",
        };
        f.write_str(s)
    }
}

/// The supervisor's nested sub-states.
///
/// `start_command`/`stop_command`/`fault_command` name *events*, not resting states: each one
/// transitions directly from any current state into its macro's `_1` sub-state in the same tick
/// (see the transition table), so there is no separate resting state to represent. INIT is the
/// one exception — the supervisor's bootstrap value and the target of an operator-issued INIT
/// command both land in [`InitCommand`](Self::InitCommand), which then auto-advances to
/// [`Init1`](Self::Init1) on the very next evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    InitCommand,
    Init1,
    InitComplete,
    Start1,
    Start2,
    StartComplete,
    Stop1,
    StopComplete,
    Fault1,
    FaultComplete,
}

impl SupervisorState {
    pub fn tag(self) -> StateTag {
        match self {
            SupervisorState::InitCommand | SupervisorState::Init1 | SupervisorState::InitComplete => {
                StateTag::Init
            }
            SupervisorState::Stop1 | SupervisorState::StopComplete => StateTag::Stop,
            SupervisorState::Start1 | SupervisorState::Start2 | SupervisorState::StartComplete => {
                StateTag::Start
            }
            SupervisorState::Fault1 | SupervisorState::FaultComplete => StateTag::Fault,
        }
    }

    /// The per-drive target CiA-402 state commanded while this supervisor state is active.
    pub fn drive_target(self) -> Ds402State {
        match self {
            SupervisorState::Start1 => Ds402State::SwitchedOn,
            SupervisorState::Start2 | SupervisorState::StartComplete => Ds402State::OperationEnabled,
            _ => Ds402State::SwitchOnDisabled,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            SupervisorState::InitComplete
                | SupervisorState::StartComplete
                | SupervisorState::StopComplete
                | SupervisorState::FaultComplete
        )
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::InitCommand => "init_command",
            SupervisorState::Init1 => "init_1",
            SupervisorState::InitComplete => "init_complete",
            SupervisorState::Start1 => "start_1",
            SupervisorState::Start2 => "start_2",
            SupervisorState::StartComplete => "start_complete",
            SupervisorState::Stop1 => "stop_1",
            SupervisorState::StopComplete => "stop_complete",
            SupervisorState::Fault1 => "fault_1",
            SupervisorState::FaultComplete => "fault_complete",
        };
        f.write_str(s)
    }
}

/// Group per-device descriptions by identical text, e.g. `"Overcurrent (dev_a,dev_b); Overheat
/// (dev_c)"`. Used both for the supervisor's merged `fault_desc` and — with a single entry — for
/// each [`crate::drive::DriveAdapter`]'s own prefixed `fault_desc`.
pub fn merge_device_descriptions<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut groups: Vec<(&'a str, Vec<&'a str>)> = Vec::new();
    for (slug, desc) in entries {
        match groups.iter_mut().find(|(d, _)| *d == desc) {
            Some(group) => group.1.push(slug),
            None => groups.push((desc, vec![slug])),
        }
    }
    groups
        .into_iter()
        .map(|(desc, slugs)| format!("{desc} ({})", slugs.join(",")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level fleet coordinator. Owns every [`DriveAdapter`] for the process lifetime.
pub struct Supervisor {
    drives: Vec<DriveAdapter>,
    external_in: InterfaceBundle,
    out: InterfaceBundle,
    config: McrConfig,
    /// Per-model SDO/PDO/sync-manager configuration, opaque to this crate (§9's "process-wide
    /// configuration singleton" redesign): owned here and handed out by reference to whatever
    /// external configurator sets a drive up, never read by the supervisor itself.
    device_config: DeviceConfigRegistry,
    state: SupervisorState,
    ticks_in_state: u32,
    fault_desc_latched: String,
    command_complete: bool,
    fast_track: bool,
    shutdown: bool,
    last_feedback: Vec<DriveFeedback>,
    fault_devs: Vec<String>,
    waiting_devs: Vec<String>,
}

impl Supervisor {
    pub fn new(drives: Vec<DriveAdapter>, config: McrConfig) -> Self {
        let mut external_in = InterfaceBundle::new();
        external_in.declare("state_cmd", 0u8, DataType::U8);
        external_in.declare("state_set", false, DataType::Bit);
        external_in.freeze();

        let mut out = InterfaceBundle::new();
        out.declare("state", StateTag::Init.code(), DataType::U8);
        out.declare("state_log", "", DataType::Str);
        out.declare("drive_state", "", DataType::Str);
        out.declare("command_complete", false, DataType::Bit);
        out.declare("reset", false, DataType::Bit);
        out.declare("enabled", false, DataType::Bit);
        out.declare("fault", false, DataType::Bit);
        out.declare("fault_desc", "", DataType::Str);
        out.declare("goal_reached", false, DataType::Bit);
        out.declare("goal_reason", "", DataType::Str);
        out.declare("any_fault", false, DataType::Bit);
        for drive in &drives {
            let slug = drive.addr_slug();
            out.declare(format!("{slug}_status_word"), 0u16, DataType::U16);
            out.declare(format!("{slug}_control_word"), 0u16, DataType::U16);
            out.declare(format!("{slug}_error_code"), 0u32, DataType::U32);
            out.declare(format!("{slug}_description"), "", DataType::Str);
            out.declare(format!("{slug}_advice"), "", DataType::Str);
            out.declare(format!("{slug}_fault"), false, DataType::Bit);
            out.declare(format!("{slug}_fault_desc"), "", DataType::Str);
            out.declare(format!("{slug}_goal_reached"), false, DataType::Bit);
            out.declare(format!("{slug}_goal_reason"), "", DataType::Str);
        }
        out.freeze();

        Self {
            drives,
            external_in,
            out,
            config,
            device_config: DeviceConfigRegistry::new(),
            state: SupervisorState::InitCommand,
            ticks_in_state: 0,
            fault_desc_latched: String::new(),
            command_complete: false,
            fast_track: false,
            shutdown: false,
            last_feedback: Vec::new(),
            fault_devs: Vec::new(),
            waiting_devs: Vec::new(),
        }
    }

    /// Attach the per-model device configuration this fleet's drives were set up with. Purely
    /// informational from this crate's point of view — an external configurator reads it back out
    /// via [`device_config`](Self::device_config); the supervisor never inspects it.
    pub fn with_device_config(mut self, device_config: DeviceConfigRegistry) -> Self {
        self.device_config = device_config;
        self
    }

    pub fn device_config(&self) -> &DeviceConfigRegistry {
        &self.device_config
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn out(&self) -> &InterfaceBundle {
        &self.out
    }

    pub fn drives(&self) -> &[DriveAdapter] {
        &self.drives
    }

    pub fn fast_track(&self) -> bool {
        self.fast_track
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
    }

    /// Operator shutdown request. Checked at tick boundaries only (§5); does not interrupt an
    /// in-progress tick.
    pub fn request_shutdown(&mut self) {
        self.shutdown = true;
    }

    /// Latch an external command request. Only takes effect on the rising edge of `state_set`,
    /// observed by the next [`set_command`](Self::set_command) call.
    pub fn request(&mut self, state_cmd: u8, state_set: bool) {
        self.external_in.update([
            ("state_cmd", AttrValue::U8(state_cmd)),
            ("state_set", AttrValue::Bit(state_set)),
        ]);
    }

    /// Pull feedback for every drive from the external master.
    pub fn read(&mut self, master: &mut dyn Master) -> Result<(), MasterError> {
        for drive in &mut self.drives {
            drive.read(master)?;
        }
        Ok(())
    }

    /// Decode every drive's feedback and merge it into the supervisor's own bundle.
    pub fn get_feedback(&mut self) {
        self.last_feedback = self.drives.iter_mut().map(|d| d.get_feedback()).collect();

        self.fault_devs.clear();
        self.waiting_devs.clear();
        for (drive, fb) in self.drives.iter().zip(&self.last_feedback) {
            let slug = drive.addr_slug();
            self.out.set(&format!("{slug}_status_word"), fb.status_word);
            self.out.set(&format!("{slug}_error_code"), fb.error_code);
            self.out.set(&format!("{slug}_description"), fb.description.clone());
            self.out.set(&format!("{slug}_advice"), fb.advice.clone());
            self.out.set(&format!("{slug}_fault"), fb.fault);
            self.out.set(&format!("{slug}_fault_desc"), fb.fault_desc.clone());
            self.out.set(&format!("{slug}_goal_reached"), fb.goal_reached);
            self.out.set(&format!("{slug}_goal_reason"), fb.goal_reason.clone());
            if fb.fault {
                self.fault_devs.push(slug.to_string());
            }
            if !fb.goal_reached {
                self.waiting_devs.push(slug.to_string());
            }
        }
        self.out.set("any_fault", !self.fault_devs.is_empty());

        // goal_reached/command_complete mirror each other by construction (both derive from the
        // same per-state completion guard evaluated in set_command); exposing goal_reached here,
        // ahead of this tick's set_command, reflects the previous tick's completion status until
        // set_command recomputes it below.
        self.out.set("goal_reached", self.command_complete);
    }

    /// Run the FSM: latch any pending external command, arbitrate a new fault against it, attempt
    /// the current state's automatic transition, and check goal-reached timeouts. Propagates the
    /// resulting per-drive target state to every [`DriveAdapter`].
    pub fn set_command(&mut self) {
        self.fast_track = false;
        let before = self.state;

        let requested = self.latch_external_command();
        let new_fault = self.out.rising_edge("any_fault");

        if new_fault {
            if requested.is_some() {
                log::warn!("external command ignored: a new fault takes precedence this tick");
            }
            self.enter_fault_1("Manager fault");
        } else if let Some(tag) = requested {
            self.enter_command(tag);
        } else {
            self.try_automatic_transition();
            if self.state == before {
                self.check_goal_timeout();
            }
        }

        if self.state != before {
            self.fast_track = true;
            self.ticks_in_state = 0;
        } else {
            self.ticks_in_state += 1;
        }

        self.command_complete = self.state.is_terminal();
        self.apply_drive_targets();
        self.update_output_bundle();
    }

    fn latch_external_command(&mut self) -> Option<StateTag> {
        if !self.external_in.rising_edge("state_set") {
            return None;
        }
        let code = self.external_in.get("state_cmd").as_u8();
        let tag = match StateTag::from_code(code) {
            Some(tag) => tag,
            None => {
                log::warn!("unknown state_cmd {code}, command dropped");
                return None;
            }
        };

        let in_init = self.state.tag() == StateTag::Init && self.state != SupervisorState::InitComplete;
        if in_init && tag != StateTag::Init {
            log::warn!("command {tag} ignored while initializing");
            return None;
        }

        if self.state.tag() == tag && !self.state.is_terminal() {
            log::warn!("command {tag} already in flight, ignored");
            return None;
        }

        Some(tag)
    }

    fn enter_command(&mut self, tag: StateTag) {
        match tag {
            StateTag::Init => {
                self.state = SupervisorState::InitCommand;
                self.state_log("accepted INIT command");
            }
            StateTag::Stop => {
                self.state = SupervisorState::Stop1;
                self.state_log("accepted STOP command");
            }
            StateTag::Start => {
                self.state = SupervisorState::Start1;
                self.state_log("accepted START command");
            }
            StateTag::Fault => {
                self.enter_fault_1("Manager fault (operator command)");
                return;
            }
        }
    }

    fn enter_fault_1(&mut self, reason: &str) {
        self.state = SupervisorState::Fault1;
        self.state_log(reason);
        let desc = self.live_fault_desc();
        self.fault_desc_latched = if desc.is_empty() {
            reason.to_string()
        } else {
            desc
        };
    }

    fn try_automatic_transition(&mut self) {
        match self.state {
            SupervisorState::InitCommand => {
                self.state = SupervisorState::Init1;
                self.state_log("waiting for devices online");
            }
            SupervisorState::Init1 => {
                if self.all_operational() && self.all_goal_reached() {
                    self.state = SupervisorState::InitComplete;
                    self.state_log("all devices online");
                }
            }
            SupervisorState::Start1 => {
                if self.all_goal_reached() {
                    self.state = SupervisorState::Start2;
                    self.state_log("all drives switched on, enabling operation");
                }
            }
            SupervisorState::Start2 => {
                if self.all_goal_reached() {
                    self.state = SupervisorState::StartComplete;
                    self.state_log("start complete");
                }
            }
            SupervisorState::Stop1 => {
                if self.all_goal_reached() {
                    self.state = SupervisorState::StopComplete;
                    self.state_log("stop complete");
                }
            }
            SupervisorState::Fault1 => {
                if self.all_goal_reached() || self.timed_out() {
                    self.state = SupervisorState::FaultComplete;
                    self.state_log("fault handling complete");
                }
            }
            SupervisorState::InitComplete => {
                self.state = SupervisorState::Stop1;
                self.state_log("Automatic 'stop' command at init complete");
            }
            SupervisorState::StartComplete
            | SupervisorState::StopComplete
            | SupervisorState::FaultComplete => {}
        }
    }

    fn check_goal_timeout(&mut self) {
        if matches!(self.state, SupervisorState::Fault1) || self.state.is_terminal() {
            return;
        }
        if self.timed_out() {
            let msg = format!(
                "timeout waiting on {} devices: {}",
                self.waiting_devs.len(),
                self.waiting_devs.join(",")
            );
            self.enter_fault_1(&msg);
        }
    }

    fn timed_out(&self) -> bool {
        self.ticks_in_state >= self.timeout_ticks()
    }

    fn timeout_ticks(&self) -> u32 {
        let seconds = if self.state.tag() == StateTag::Init {
            self.config.init_timeout
        } else {
            self.config.goal_state_timeout
        };
        (seconds * self.config.update_rate).round() as u32
    }

    fn all_goal_reached(&self) -> bool {
        self.last_feedback.iter().all(|fb| fb.goal_reached)
    }

    fn all_operational(&self) -> bool {
        self.last_feedback.iter().all(|fb| fb.operational)
    }

    fn live_fault_desc(&self) -> String {
        merge_device_descriptions(
            self.drives
                .iter()
                .zip(&self.last_feedback)
                .filter(|(_, fb)| fb.fault)
                .map(|(d, fb)| (d.addr_slug(), fb.description.as_str())),
        )
    }

    fn state_log(&mut self, msg: &str) {
        log::info!("supervisor: {msg} (now {})", self.state);
        self.out.set("state_log", msg);
    }

    fn apply_drive_targets(&mut self) {
        let target = self.state.drive_target();
        let reset = matches!(self.state, SupervisorState::Start2);
        for drive in &mut self.drives {
            drive.set_command(target, 0, reset);
        }
        self.out.set("reset", reset);
    }

    fn update_output_bundle(&mut self) {
        let fault_desc = if self.state.tag() == StateTag::Fault {
            self.fault_desc_latched.clone()
        } else {
            self.live_fault_desc()
        };
        let goal_reason = if self.waiting_devs.is_empty() {
            String::new()
        } else {
            format!("Waiting: {}", self.waiting_devs.join(","))
        };
        let enabled = self.state.tag() == StateTag::Start && self.command_complete;

        self.out.set("state", self.state.tag().code());
        self.out.set("drive_state", self.state.drive_target().to_string());
        self.out.set("command_complete", self.command_complete);
        self.out.set("enabled", enabled);
        self.out.set("fault", self.state.tag() == StateTag::Fault);
        self.out.set("fault_desc", fault_desc);
        self.out.set("goal_reached", self.command_complete);
        self.out.set("goal_reason", goal_reason);
        for drive in &self.drives {
            let slug = drive.addr_slug();
            self.out
                .set(&format!("{slug}_control_word"), drive.command().control_word);
        }
    }

    /// Flush every drive's staged control word to the external master.
    pub fn write(&mut self, master: &mut dyn Master) -> Result<(), MasterError> {
        for drive in &mut self.drives {
            drive.write(master)?;
        }
        Ok(())
    }

    /// Advance the supervisor's own bundles and every drive's bundles past the tick boundary.
    /// Must be called exactly once per tick, after [`write`](Self::write).
    pub fn advance(&mut self) {
        self.external_in.advance();
        self.out.advance();
        for drive in &mut self.drives {
            drive.advance();
        }
    }

    /// Force the supervisor into FAULT after an unhandled error escaped steps 1-4 of a tick
    /// (§4.6's exception containment). The tick proceeds normally afterward.
    pub fn force_fault_unexpected(&mut self) {
        self.enter_fault_1("Unexpected exception");
        self.command_complete = self.state.is_terminal();
        self.apply_drive_targets();
        self.update_output_bundle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_groups_identical_descriptions() {
        let merged = merge_device_descriptions([
            ("drive_a", "Overcurrent"),
            ("drive_b", "Overcurrent"),
            ("drive_c", "Overheat"),
        ]);
        assert_eq!(merged, "Overcurrent (drive_a,drive_b); Overheat (drive_c)");
    }

    #[test]
    fn merge_single_entry_matches_per_drive_format() {
        let merged = merge_device_descriptions([("drive_a", "Overcurrent")]);
        assert_eq!(merged, "Overcurrent (drive_a)");
    }

    #[test]
    fn state_tag_encoding_matches_operator_interface() {
        assert_eq!(StateTag::Init.code(), 0);
        assert_eq!(StateTag::Stop.code(), 1);
        assert_eq!(StateTag::Start.code(), 2);
        assert_eq!(StateTag::Fault.code(), 4);
    }

    #[test]
    fn unknown_state_cmd_is_rejected() {
        assert_eq!(StateTag::from_code(3), None);
        assert_eq!(StateTag::from_code(2), Some(StateTag::Start));
    }

    #[test]
    fn device_config_is_opaque_passthrough() {
        use crate::config::{DeviceConfigEntry, DeviceConfigRegistry, McrConfig};

        let mut registry = DeviceConfigRegistry::new();
        registry.register(DeviceConfigEntry {
            model_id: "c5e".to_string(),
            sdo_init: vec![(0x6040, 0, 0)],
            pdo_mapping: vec!["status_word".to_string()],
            sync_managers: vec![],
        });

        let supervisor = Supervisor::new(Vec::new(), McrConfig::default()).with_device_config(registry);
        assert!(supervisor.device_config().get("c5e").is_some());
        assert!(supervisor.device_config().get("unknown").is_none());
    }
}
