//! Pure CiA-402 drive-profile state machine.
//!
//! No I/O lives here: every function is `(status_word, ...) -> ...` or `(state, ...) -> control
//! word`. [`crate::drive::DriveAdapter`] is the only thing that calls into this module with real
//! hardware feedback.

use std::fmt;

bitflags::bitflags! {
    /// ETG6010 §5.3 Statusword bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusWord: u16 {
        /// 0 Ready to switch on, mandatory.
        const READY_TO_SWITCH_ON = 1 << 0;
        /// 1 Switched on, mandatory.
        const SWITCHED_ON = 1 << 1;
        /// 2 Operation enabled, mandatory.
        const OP_ENABLED = 1 << 2;
        /// 3 Fault, mandatory.
        const FAULT = 1 << 3;
        /// 4 Voltage enabled, optional.
        const VOLTAGE_ENABLED = 1 << 4;
        /// 5 Quick stop, optional.
        const QUICK_STOP = 1 << 5;
        /// 6 Switch on disabled, mandatory.
        const SWITCH_ON_DISABLED = 1 << 6;
        /// 7 Warning, optional.
        const WARNING = 1 << 7;
        /// 10 Target reached, optional.
        const TARGET_REACHED = 1 << 10;
        /// 11 Internal limit active, optional.
        const INTERNAL_LIMIT = 1 << 11;
    }
}

bitflags::bitflags! {
    /// ETG6010 §5.2 Controlword bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlWord: u16 {
        /// 0 Switch on, mandatory.
        const SWITCH_ON = 1 << 0;
        /// 1 Enable voltage, mandatory.
        const ENABLE_VOLTAGE = 1 << 1;
        /// 2 Quick stop, optional.
        const QUICK_STOP = 1 << 2;
        /// 3 Enable operation, mandatory.
        const ENABLE_OPERATION = 1 << 3;
        /// 7 Fault reset, mandatory.
        const FAULT_RESET = 1 << 7;
    }
}

impl ControlWord {
    /// "Shutdown" command word: SWITCH ON DISABLED -> READY TO SWITCH ON.
    pub const CMD_SHUTDOWN: Self = Self::ENABLE_VOLTAGE.union(Self::QUICK_STOP);
    /// "Switch on" command word: READY TO SWITCH ON -> SWITCHED ON (also holds through
    /// intermediate hops when written from an earlier state).
    pub const CMD_SWITCH_ON: Self = Self::CMD_SHUTDOWN.union(Self::SWITCH_ON);
    /// "Enable operation" command word: SWITCHED ON -> OPERATION ENABLED.
    pub const CMD_ENABLE_OPERATION: Self = Self::CMD_SWITCH_ON.union(Self::ENABLE_OPERATION);
    /// "Quick stop" command word: OPERATION ENABLED -> QUICK STOP ACTIVE.
    pub const CMD_QUICK_STOP: Self = Self::ENABLE_VOLTAGE;
    /// "Disable voltage" command word: any state -> SWITCH ON DISABLED, emergency-stop capable.
    pub const CMD_DISABLE_VOLTAGE: Self = Self::empty();
}

/// The CiA-402 drive profile state, per ETG6010 §5.1 and spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ds402State {
    NotReadyToSwitchOn,
    SwitchOnDisabled,
    ReadyToSwitchOn,
    SwitchedOn,
    OperationEnabled,
    QuickStopActive,
    FaultReactionActive,
    Fault,
}

impl fmt::Display for Ds402State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ds402State::NotReadyToSwitchOn => "NOT READY TO SWITCH ON",
            Ds402State::SwitchOnDisabled => "SWITCH ON DISABLED",
            Ds402State::ReadyToSwitchOn => "READY TO SWITCH ON",
            Ds402State::SwitchedOn => "SWITCHED ON",
            Ds402State::OperationEnabled => "OPERATION ENABLED",
            Ds402State::QuickStopActive => "QUICK STOP ACTIVE",
            Ds402State::FaultReactionActive => "FAULT REACTION ACTIVE",
            Ds402State::Fault => "FAULT",
        };
        f.write_str(s)
    }
}

/// Decode a 16-bit status word into a [`Ds402State`] per CiA-402 §7.3.3.3.
///
/// Mandatory bits 0,1,2,3,6 (mask `0x4F`) and the optional quick-stop bit 5 (added, mask `0x6F`)
/// are checked by presence rather than by exact-value match, so that vendor quirk bits elsewhere
/// in the word never prevent a match. Tie-break order (most specific first): FAULT_REACTION_ACTIVE
/// > FAULT > QUICK_STOP_ACTIVE > OPERATION_ENABLED > SWITCHED_ON > READY_TO_SWITCH_ON >
/// SWITCH_ON_DISABLED > NOT_READY_TO_SWITCH_ON.
pub fn decode_state(status_word: u16) -> Ds402State {
    let w = StatusWord::from_bits_truncate(status_word);

    let ready = w.contains(StatusWord::READY_TO_SWITCH_ON);
    let switched_on = w.contains(StatusWord::SWITCHED_ON);
    let op_enabled = w.contains(StatusWord::OP_ENABLED);
    let fault = w.contains(StatusWord::FAULT);
    let quick_stop = w.contains(StatusWord::QUICK_STOP);
    let switch_on_disabled = w.contains(StatusWord::SWITCH_ON_DISABLED);

    if fault && ready && switched_on && op_enabled {
        Ds402State::FaultReactionActive
    } else if fault {
        // Fault bit wins even if SWITCH_ON_DISABLED is also asserted.
        Ds402State::Fault
    } else if ready && switched_on && op_enabled && !quick_stop {
        // Mandatory bits say OPERATION ENABLED, but the quick-stop bit reads low: the drive is
        // actually mid quick-stop.
        Ds402State::QuickStopActive
    } else if ready && switched_on && op_enabled {
        Ds402State::OperationEnabled
    } else if ready && switched_on {
        Ds402State::SwitchedOn
    } else if ready {
        Ds402State::ReadyToSwitchOn
    } else if switch_on_disabled {
        Ds402State::SwitchOnDisabled
    } else {
        Ds402State::NotReadyToSwitchOn
    }
}

/// Encode one canonical status word representing `state`. Real drives may assert further optional
/// bits (warning, target reached, ...) alongside these; this produces a minimal valid example,
/// useful for simulation and for the [`decode_state`] round-trip law.
pub fn encode_state(state: Ds402State) -> u16 {
    match state {
        Ds402State::NotReadyToSwitchOn => 0x0000,
        Ds402State::SwitchOnDisabled => 0x0040,
        Ds402State::ReadyToSwitchOn => 0x0021,
        Ds402State::SwitchedOn => 0x0023,
        Ds402State::OperationEnabled => 0x0027,
        Ds402State::QuickStopActive => 0x0007,
        Ds402State::FaultReactionActive => 0x002F,
        Ds402State::Fault => 0x0008,
    }
}

/// Canonical path table: from anywhere, drive straight to SWITCH ON DISABLED.
///
/// "Disable voltage" (control word `0x0000`) is emergency-stop capable: every CiA-402 drive
/// accepts it from any state and lands in SWITCH ON DISABLED, so no intermediate hop is needed.
fn path_to_switch_on_disabled() -> ControlWord {
    ControlWord::CMD_DISABLE_VOLTAGE
}

/// Canonical path table: from anywhere, drive toward OPERATION ENABLED (or an intermediate stop
/// on that path — SWITCH ON DISABLED, READY TO SWITCH ON, or SWITCHED ON).
///
/// Each control word in this path is a strict superset of the bits required by the previous one,
/// so holding the word for the ultimate target steady across ticks also satisfies every
/// intermediate hop — the drive's own firmware walks SWITCH ON DISABLED -> READY TO SWITCH ON ->
/// SWITCHED ON -> OPERATION ENABLED on successive cycles without this machine needing to track
/// which hop it's currently serving.
fn path_to_operation_enabled(target: Ds402State) -> ControlWord {
    match target {
        Ds402State::ReadyToSwitchOn => ControlWord::CMD_SHUTDOWN,
        Ds402State::SwitchedOn => ControlWord::CMD_SWITCH_ON,
        Ds402State::OperationEnabled => ControlWord::CMD_ENABLE_OPERATION,
        _ => ControlWord::CMD_SHUTDOWN,
    }
}

/// Canonical path table: FAULT -> SWITCH ON DISABLED via a rising edge on the fault-reset bit.
/// The edge itself is applied by [`next_control_word`]'s `reset` parameter, not here; this just
/// names the base word fault-reset is overlaid on.
fn path_to_fault_reset() -> ControlWord {
    ControlWord::CMD_DISABLE_VOLTAGE
}

/// Compute the control word that moves `current` one hop along the shortest path toward `target`.
///
/// If `current` is FAULT and `target` is anything other than SWITCH ON DISABLED or FAULT itself,
/// the drive is first routed through SWITCH ON DISABLED — there is no direct path out of FAULT
/// except via a fault-reset edge. If `reset` is `true`, the fault-reset bit is set in the emitted
/// word regardless of path; the caller (the drive adapter) is responsible for clearing it again
/// on the following tick so the bit is seen as an edge, not a level.
pub fn next_control_word(current: Ds402State, target: Ds402State, reset: bool) -> u16 {
    let effective_target = if current == Ds402State::Fault && target != Ds402State::SwitchOnDisabled {
        Ds402State::SwitchOnDisabled
    } else {
        target
    };

    let base = match effective_target {
        Ds402State::SwitchOnDisabled => path_to_switch_on_disabled(),
        Ds402State::NotReadyToSwitchOn | Ds402State::Fault | Ds402State::FaultReactionActive => {
            path_to_fault_reset()
        }
        Ds402State::QuickStopActive => ControlWord::CMD_QUICK_STOP,
        other => path_to_operation_enabled(other),
    };

    let mut word = base;
    if reset {
        word |= ControlWord::FAULT_RESET;
    }
    word.bits()
}

/// A drive has reached its goal iff its decoded current state exactly matches the commanded
/// target. QUICK_STOP_ACTIVE and FAULT are distinct states from OPERATION_ENABLED so they never
/// spuriously satisfy it.
pub fn reached_goal(current: Ds402State, target: Ds402State) -> bool {
    current == target
}
