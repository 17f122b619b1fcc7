// src/device/controller.rs

use super::context::DeviceContext;
use super::plan::PollPlan;
use super::state::Due;
use crate::common::{
    error::UplinkError,
    hal_traits::{BusClock, LoraModem, Rs485Serial},
    timing::Millis,
};
use crate::master::SyncMaster;
use crate::uplink::payload::{FrameHeader, Reading, UplinkPayload};
use heapless::Vec;

/// What one loop cycle did.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CycleReport {
    /// Cadences collected; `Due::NONE` for an idle cycle.
    pub due: Due,
    /// Reads attempted.
    pub attempted: u8,
    /// Reads that returned registers.
    pub succeeded: u8,
    /// Failed reads (the cycle's error total).
    pub error_total: u16,
    /// Whether the last read of the cycle failed.
    pub error_flag: bool,
    /// Uplink frame size, 0 when nothing was sent.
    pub sent_bytes: usize,
}

impl CycleReport {
    pub fn is_idle(&self) -> bool {
        self.attempted == 0 && self.sent_bytes == 0
    }
}

/// Main loop body of a control unit: poll the bus, account errors, send.
#[derive(Debug)]
pub struct Controller<IF, const N: usize>
where
    IF: Rs485Serial + BusClock,
{
    master: SyncMaster<IF>,
    plan: PollPlan<N>,
}

impl<IF, const N: usize> Controller<IF, N>
where
    IF: Rs485Serial + BusClock,
{
    pub fn new(master: SyncMaster<IF>, plan: PollPlan<N>) -> Self {
        Controller { master, plan }
    }

    pub fn master(&self) -> &SyncMaster<IF> {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut SyncMaster<IF> {
        &mut self.master
    }

    pub fn plan(&self) -> &PollPlan<N> {
        &self.plan
    }

    /// Runs a cycle at the interface clock's current time.
    pub fn run_once<M: LoraModem>(
        &mut self,
        ctx: &mut DeviceContext<M>,
    ) -> Result<CycleReport, UplinkError<M::Error>> {
        let now = self.master.interface().now();
        self.run_cycle(ctx, now)
    }

    /// Runs one loop cycle as of `now`.
    ///
    /// Failed Modbus reads never abort the cycle: they are counted in the
    /// context's `ErrorTally` and reported in the uplink frame. Timestamps
    /// move only after the frame has been handed to the modem, so a failed
    /// send is retried on the next cycle.
    pub fn run_cycle<M: LoraModem>(
        &mut self,
        ctx: &mut DeviceContext<M>,
        now: Millis,
    ) -> Result<CycleReport, UplinkError<M::Error>> {
        let (config, credentials, session, timestamps, errors) = ctx.parts_mut();
        errors.begin_cycle();

        let due = match &config.schedule {
            Some(schedule) => timestamps.due(now, schedule),
            None => Due::ALL,
        };
        if !due.any() {
            trace!("cycle: nothing due at {=u32}ms", now.as_u32());
            return Ok(CycleReport::default());
        }

        let mut report = CycleReport { due, ..CycleReport::default() };
        let mut readings: Vec<Reading, N> = Vec::new();

        for read in self.plan.selected(due) {
            report.attempted = report.attempted.saturating_add(1);
            let result = self.master.read_registers(&read.request);
            errors.record(&result);

            match result {
                Ok(registers) => {
                    report.succeeded = report.succeeded.saturating_add(1);
                    // Never more readings than plan entries
                    let _ = readings.push(Reading { request: read.request, registers });
                }
                Err(e) => {
                    warn!(
                        "modbus: {=str} (slave {=u8}) failed: {=str}",
                        read.label.as_str(),
                        read.request.slave().as_u8(),
                        e.kind()
                    );
                }
            }
        }

        report.error_total = errors.total();
        report.error_flag = errors.flag();
        if report.error_total > 0 {
            warn!("cycle: {=u16} of {=u8} reads failed", report.error_total, report.attempted);
        }

        let header = FrameHeader {
            profile: config.profile.id(),
            cadence_flags: due.flags(),
            error_total: report.error_total,
        };
        let payload = UplinkPayload::encode(header, &readings, session.modem().max_payload_len())
            .map_err(UplinkError::widen)?;

        session.begin(config.uplink.region)?;
        session.ensure_joined(credentials, config.uplink.join_attempts, self.master.interface_mut())?;
        session.send(config.uplink.port, payload.as_bytes(), config.uplink.confirmed)?;

        timestamps.mark(due, now);
        report.sent_bytes = payload.len();
        info!(
            "cycle: sent {=usize} bytes, {=u8}/{=u8} reads ok",
            report.sent_bytes,
            report.succeeded,
            report.attempted
        );
        Ok(report)
    }
}
