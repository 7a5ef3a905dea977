//! Shared fixtures for the scenario replay tests under `tests/`.
//!
//! Mirrors the donor's own `tests/util.rs` convention of factoring fixture setup out of each
//! `replay-*.rs` file rather than repeating it.

#![allow(dead_code)]

use cia402_fleet_supervisor::{
    DriveAddress, DriveAdapter, DriveModel, ErrorCatalog, ErrorEntry, McrConfig, ProfileVariant,
    StatusWordQuirk, Supervisor,
};
use cia402_fleet_supervisor::sim_master::{SimDeviceData, SimMaster};
use std::sync::Arc;

pub const DRIVE_A: DriveAddress = DriveAddress {
    bus_index: 0,
    alias: 1,
    position: 1,
};
pub const DRIVE_B: DriveAddress = DriveAddress {
    bus_index: 0,
    alias: 1,
    position: 2,
};

fn model(id: &str) -> DriveModel {
    DriveModel {
        vendor_id: 0x1234,
        product_code: 0x5678,
        revision: 1,
        model_id: id.to_string(),
        profile: ProfileVariant::Csp,
        quirk: StatusWordQuirk::None,
        sim: true,
    }
}

/// Two simulated drives, both starting at SWITCH ON DISABLED, with an error catalog carrying the
/// overcurrent entry S3/S6 inject.
pub fn two_drive_fleet() -> (Supervisor, SimMaster) {
    let catalog = Arc::new(ErrorCatalog::from_entries([ErrorEntry {
        code: 0x7305,
        description: "Overcurrent".to_string(),
        advice: "Check motor wiring".to_string(),
    }]));

    let drives = vec![
        DriveAdapter::new(DRIVE_A, model("drive-a"), catalog.clone()),
        DriveAdapter::new(DRIVE_B, model("drive-b"), catalog),
    ];
    let master = SimMaster::new([
        SimDeviceData {
            address: DRIVE_A,
            vendor_id: 0x1234,
            product_code: 0x5678,
            revision: 1,
        },
        SimDeviceData {
            address: DRIVE_B,
            vendor_id: 0x1234,
            product_code: 0x5678,
            revision: 1,
        },
    ]);
    (Supervisor::new(drives, McrConfig::default()), master)
}

/// Same two-drive fleet as [`two_drive_fleet`], but with caller-supplied timing so scenarios like
/// S5's goal timeout can use a short, test-sized timeout instead of the real defaults.
pub fn two_drive_fleet_with_config(config: McrConfig) -> (Supervisor, SimMaster) {
    let catalog = Arc::new(ErrorCatalog::from_entries([]));
    let drives = vec![
        DriveAdapter::new(DRIVE_A, model("drive-a"), catalog.clone()),
        DriveAdapter::new(DRIVE_B, model("drive-b"), catalog),
    ];
    let master = SimMaster::new([
        SimDeviceData {
            address: DRIVE_A,
            vendor_id: 0x1234,
            product_code: 0x5678,
            revision: 1,
        },
        SimDeviceData {
            address: DRIVE_B,
            vendor_id: 0x1234,
            product_code: 0x5678,
            revision: 1,
        },
    ]);
    (Supervisor::new(drives, config), master)
}

/// Run one full tick: read -> get_feedback -> set_command -> write -> advance.
pub fn tick(supervisor: &mut Supervisor, master: &mut SimMaster) {
    supervisor.read(master).expect("sim master never fails");
    supervisor.get_feedback();
    supervisor.set_command();
    supervisor.write(master).expect("sim master never fails");
    supervisor.advance();
}
