//! S1 — cold init to stop (spec.md §8, scenario S1).
//!
//! Two simulated drives both start at SWITCH ON DISABLED. With no operator command, the
//! supervisor walks init_command -> init_1 -> init_complete, auto-issues STOP at init complete,
//! and settles at stop_complete with the fleet goal-reached.

mod util;

use cia402_fleet_supervisor::{StateTag, SupervisorState};

#[test]
fn cold_init_settles_at_stop_complete_with_goal_reached() {
    let (mut supervisor, mut master) = util::two_drive_fleet();

    for _ in 0..5 {
        util::tick(&mut supervisor, &mut master);
        if supervisor.state() == SupervisorState::StopComplete {
            break;
        }
    }

    assert_eq!(supervisor.state(), SupervisorState::StopComplete);
    assert_eq!(supervisor.state().tag(), StateTag::Stop);
    assert!(supervisor.out().get("command_complete").as_bool());
    assert!(supervisor.out().get("goal_reached").as_bool());
    assert!(!supervisor.out().get("fault").as_bool());
}
