use crate::sensor::AttitudeSensor;
use crate::solver::AttitudeCell;
use crate::transport::BusTransport;
use crate::types::Attitude;
use crate::{AttitudeError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// Handle to a running attitude polling thread.
///
/// The thread owns the sensor and keeps the attitude cell current. Readers
/// on any thread take snapshots through [`AttitudePoller::handle`].
pub struct AttitudePoller {
    cell: AttitudeCell,
    report_id: u8,
    shutdown: Option<Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl AttitudePoller {
    pub(crate) fn start<T: BusTransport + 'static>(sensor: AttitudeSensor<T>) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let cell = sensor.handle();
        let report_id = sensor.solver().report_id();

        let thread = std::thread::Builder::new()
            .name("horizon-attitude".into())
            .spawn(move || {
                poll_loop(sensor, shutdown_rx);
            })
            .map_err(|e| AttitudeError::ThreadSpawn(e.to_string()))?;

        Ok(AttitudePoller {
            cell,
            report_id,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Latest attitude, possibly stale.
    pub fn attitude(&self) -> Attitude {
        self.cell.load()
    }

    /// Cell for render-side readers. Stays readable after the poller stops.
    pub fn handle(&self) -> AttitudeCell {
        self.cell.clone()
    }

    /// Report id being decoded.
    pub fn report_id(&self) -> u8 {
        self.report_id
    }

    /// Check if the polling thread is still running.
    pub fn is_active(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop polling and wait for the thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for AttitudePoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Polls the bus every `poll_interval` until a shutdown is signalled or
/// the poller handle is dropped.
fn poll_loop<T: BusTransport>(mut sensor: AttitudeSensor<T>, shutdown: Receiver<()>) {
    let interval = sensor.config().poll_interval;
    log::info!(
        "Attitude poller started (report 0x{:02x}, every {:?})",
        sensor.solver().report_id(),
        interval
    );

    let mut updates: u64 = 0;
    loop {
        match sensor.poll_once() {
            Ok(Some(_)) => updates += 1,
            Ok(None) => {}
            Err(e) => log::warn!("Attitude poll failed: {}", e),
        }

        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("Attitude poller stopping after {} updates", updates);
}
