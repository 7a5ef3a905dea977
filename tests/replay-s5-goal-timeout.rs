//! S5 — goal timeout (spec.md §8, scenario S5).
//!
//! With `goal_state_timeout=2s` and `update_rate=10Hz` (20 ticks), a drive that never reaches its
//! commanded SWITCHED ON goal forces the supervisor into fault_1, with the timeout message naming
//! the stuck drive.

mod util;

use cia402_fleet_supervisor::{McrConfig, StateTag, SupervisorState};

#[test]
fn stuck_drive_escalates_to_fault_after_goal_timeout() {
    let config = McrConfig {
        update_rate: 10.0,
        init_timeout: 30.0,
        goal_state_timeout: 2.0,
    };
    let (mut supervisor, mut master) = util::two_drive_fleet_with_config(config);
    master.stick(util::DRIVE_B);

    for _ in 0..5 {
        util::tick(&mut supervisor, &mut master);
    }
    supervisor.request(StateTag::Start.code(), true);

    let mut escalated = false;
    for _ in 0..30 {
        util::tick(&mut supervisor, &mut master);
        supervisor.request(StateTag::Start.code(), false);
        if supervisor.state() == SupervisorState::Fault1 {
            escalated = true;
            break;
        }
    }

    assert!(escalated, "expected a goal timeout to escalate to fault_1");
    let state_log = supervisor.out().get("state_log").as_str().to_string();
    assert!(state_log.contains(&util::DRIVE_B.addr_slug()), "timeout message should name the stuck drive: {state_log}");
}
