//! C6 — the cyclic pipeline binding the supervisor and every drive to the external master under
//! a fixed update-rate budget.
//!
//! Scheduling model is single-threaded cooperative (§5): one periodic loop, strict
//! happens-before of read -> get_feedback -> set_command -> write -> advance, no internal
//! parallelism. The only suspension points are the inter-tick sleep and whatever blocking the
//! external [`Master`] does inside `read`/`write`.

use crate::config::McrConfig;
use crate::master::Master;
use crate::supervisor::Supervisor;
use std::time::{Duration, Instant};

/// Runs [`Supervisor`] ticks at a fixed period against a [`Master`], containing any error raised
/// during a tick's I/O or command phases by forcing the supervisor into FAULT rather than
/// propagating it to the caller.
pub struct Pipeline<M: Master> {
    supervisor: Supervisor,
    master: M,
    period: Duration,
}

impl<M: Master> Pipeline<M> {
    pub fn new(supervisor: Supervisor, master: M, config: McrConfig) -> Self {
        let period = Duration::from_secs_f64(1.0 / config.update_rate);
        Self {
            supervisor,
            master,
            period,
        }
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut Supervisor {
        &mut self.supervisor
    }

    /// Run ticks until [`Supervisor::request_shutdown`] has been called, sleeping to the next
    /// period boundary unless a tick set `fast_track`.
    pub fn run(&mut self) {
        while !self.supervisor.shutdown_requested() {
            let started = Instant::now();
            self.tick();
            if !self.supervisor.fast_track() {
                let elapsed = started.elapsed();
                if elapsed < self.period {
                    std::thread::sleep(self.period - elapsed);
                }
            }
        }
    }

    /// Run exactly one tick: read -> get_feedback -> set_command -> write -> advance.
    ///
    /// Any error from steps 1-4 is caught here, logged, and converted into a forced FAULT
    /// transition rather than propagated — matching the exception-containment policy (§4.6):
    /// the loop (and the caller) always sees a normal return.
    pub fn tick(&mut self) {
        if let Err(e) = self.supervisor.read(&mut self.master) {
            log::error!("unhandled error in read(): {e}");
            self.supervisor.force_fault_unexpected();
            self.supervisor.advance();
            return;
        }

        self.supervisor.get_feedback();
        self.supervisor.set_command();

        if let Err(e) = self.supervisor.write(&mut self.master) {
            log::error!("unhandled error in write(): {e}");
            self.supervisor.force_fault_unexpected();
        }

        self.supervisor.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::{DriveAddress, DriveAdapter, DriveModel, ProfileVariant, StatusWordQuirk};
    use crate::error_catalog::ErrorCatalog;
    use crate::sim_master::{SimDeviceData, SimMaster};
    use std::sync::Arc;

    fn single_drive_pipeline() -> Pipeline<SimMaster> {
        let addr = DriveAddress::new(0, 0, 1);
        let model = DriveModel {
            vendor_id: 1,
            product_code: 1,
            revision: 1,
            model_id: "a".to_string(),
            profile: ProfileVariant::Csp,
            quirk: StatusWordQuirk::None,
            sim: true,
        };
        let catalog = Arc::new(ErrorCatalog::from_entries([]));
        let drives = vec![DriveAdapter::new(addr, model, catalog)];
        let master = SimMaster::new([SimDeviceData {
            address: addr,
            vendor_id: 1,
            product_code: 1,
            revision: 1,
        }]);
        let supervisor = Supervisor::new(drives, McrConfig::default());
        Pipeline::new(supervisor, master, McrConfig::default())
    }

    #[test]
    fn tick_runs_full_read_feedback_command_write_advance_cycle() {
        let mut pipeline = single_drive_pipeline();
        pipeline.tick();
        // advance() was called, so current == previous on every attribute touched this tick.
        assert!(!pipeline.supervisor().out().changed("state"));
    }

    #[test]
    fn master_io_error_forces_fault_instead_of_propagating() {
        struct AlwaysFailsMaster;
        impl Master for AlwaysFailsMaster {
            fn scan(&mut self) -> Result<Vec<crate::master::DiscoveredDrive>, crate::master::MasterError> {
                Err(crate::master::MasterError("scan unavailable".to_string()))
            }
            fn sdo_read(
                &mut self,
                _addr: DriveAddress,
                _index: u16,
                _subindex: u8,
            ) -> Result<crate::bundle::AttrValue, crate::master::MasterError> {
                Err(crate::master::MasterError("sdo unavailable".to_string()))
            }
            fn sdo_write(
                &mut self,
                _addr: DriveAddress,
                _index: u16,
                _subindex: u8,
                _value: crate::bundle::AttrValue,
            ) -> Result<(), crate::master::MasterError> {
                Err(crate::master::MasterError("sdo unavailable".to_string()))
            }
            fn pdo_read(
                &mut self,
                _addr: DriveAddress,
                _key: &str,
            ) -> Result<crate::bundle::AttrValue, crate::master::MasterError> {
                Err(crate::master::MasterError("bus offline".to_string()))
            }
            fn pdo_write(
                &mut self,
                _addr: DriveAddress,
                _key: &str,
                _value: crate::bundle::AttrValue,
            ) -> Result<(), crate::master::MasterError> {
                Err(crate::master::MasterError("bus offline".to_string()))
            }
        }

        let addr = DriveAddress::new(0, 0, 1);
        let model = DriveModel {
            vendor_id: 1,
            product_code: 1,
            revision: 1,
            model_id: "a".to_string(),
            profile: ProfileVariant::Csp,
            quirk: StatusWordQuirk::None,
            sim: true,
        };
        let catalog = Arc::new(ErrorCatalog::from_entries([]));
        let supervisor = Supervisor::new(vec![DriveAdapter::new(addr, model, catalog)], McrConfig::default());
        let mut pipeline = Pipeline::new(supervisor, AlwaysFailsMaster, McrConfig::default());

        pipeline.tick();

        assert!(pipeline.supervisor().out().get("fault").as_bool());
        assert_eq!(
            pipeline.supervisor().out().get("state_log").as_str(),
            "Unexpected exception"
        );
    }

    #[test]
    fn run_stops_promptly_after_shutdown_is_requested() {
        let mut pipeline = single_drive_pipeline();
        pipeline.supervisor_mut().request_shutdown();
        pipeline.run();
        assert!(pipeline.supervisor().shutdown_requested());
    }
}
