//! Standalone demo wiring a [`SimMaster`] fleet through the full cyclic pipeline.
//!
//! Not part of the crate's public API contract — in the spirit of the donor's own `ds402/src/
//! main.rs` standalone example, this just exercises the supervisor end to end on simulated
//! hardware so the FSM's behavior can be watched in logs rather than only in unit tests.

use cia402_fleet_supervisor::sim_master::{SimDeviceData, SimMaster};
use cia402_fleet_supervisor::{
    DriveAddress, DriveAdapter, DriveModel, ErrorCatalog, McrConfig, Pipeline, ProfileVariant,
    StateTag, StatusWordQuirk, Supervisor,
};
use env_logger::Env;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let addresses = [
        DriveAddress::new(0, 1, 1),
        DriveAddress::new(0, 1, 2),
        DriveAddress::new(0, 1, 3),
    ];

    let catalog = Arc::new(ErrorCatalog::from_entries([]));
    let drives = addresses
        .iter()
        .enumerate()
        .map(|(i, &address)| {
            DriveAdapter::new(
                address,
                DriveModel {
                    vendor_id: 0x0001_0000,
                    product_code: 0x0002_0000,
                    revision: 1,
                    model_id: format!("sim-drive-{i}"),
                    profile: ProfileVariant::Csp,
                    quirk: StatusWordQuirk::None,
                    sim: true,
                },
                catalog.clone(),
            )
        })
        .collect();

    let master = SimMaster::new(addresses.iter().map(|&address| SimDeviceData {
        address,
        vendor_id: 0x0001_0000,
        product_code: 0x0002_0000,
        revision: 1,
    }));

    let config = McrConfig::default();
    let supervisor = Supervisor::new(drives, config);
    let mut pipeline = Pipeline::new(supervisor, master, config);

    // Run init to completion, then request START and run a handful more ticks so the log shows
    // the fleet walking start_1 -> start_2 -> start_complete.
    for _ in 0..10 {
        pipeline.tick();
    }
    pipeline.supervisor_mut().request(StateTag::Start.code(), true);
    for i in 0..20 {
        pipeline.tick();
        if i == 0 {
            pipeline.supervisor_mut().request(StateTag::Start.code(), false);
        }
        if pipeline.supervisor().out().get("enabled").as_bool() {
            log::info!("fleet enabled after {} ticks", i + 1);
            break;
        }
    }

    pipeline.supervisor_mut().request_shutdown();
}
