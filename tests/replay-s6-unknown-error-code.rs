//! S6 — unknown error code (spec.md §8, scenario S6).
//!
//! A drive reporting an error code absent from its model's catalog still gets a synthesized,
//! human-readable description rather than surfacing a lookup failure.

mod util;

use cia402_fleet_supervisor::{DriveAdapter, DriveModel, ErrorCatalog, ProfileVariant, StatusWordQuirk};
use std::sync::Arc;

#[test]
fn unknown_error_code_synthesizes_description_and_fault() {
    let catalog = Arc::new(ErrorCatalog::from_entries([]));
    let mut adapter = DriveAdapter::new(
        util::DRIVE_A,
        DriveModel {
            vendor_id: 0x1234,
            product_code: 0x5678,
            revision: 1,
            model_id: "drive-a".to_string(),
            profile: ProfileVariant::Csp,
            quirk: StatusWordQuirk::None,
            sim: true,
        },
        catalog,
    );

    let mut master = cia402_fleet_supervisor::sim_master::SimMaster::new([
        cia402_fleet_supervisor::sim_master::SimDeviceData {
            address: util::DRIVE_A,
            vendor_id: 0x1234,
            product_code: 0x5678,
            revision: 1,
        },
    ]);
    master.inject_error(util::DRIVE_A, 0xDEAD);
    adapter.read(&mut master).unwrap();
    let feedback = adapter.get_feedback();

    assert!(feedback.fault);
    assert_eq!(feedback.description, "Unknown error code 57005");
    assert_eq!(feedback.advice, "Contact technical support");
}
