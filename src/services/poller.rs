use log::{info, warn};
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::{Duration, Instant};

use crate::climate::{ClimateEntity, RefreshRequest};

/// Poll `entity` at a steady cadence, publishing its state after every cycle.
///
/// Failed polls are logged and the loop carries on; the entity keeps its last
/// known state until a later poll succeeds. Returns the number of cycles run.
pub fn run_loop<E: ClimateEntity>(
    entity: &mut E,
    refreshes: &Receiver<RefreshRequest>,
    interval: Duration,
    max_cycles: Option<u64>,
) -> Result<u64, String> {
    let mut cycles = 0u64;
    loop {
        if max_cycles.is_some_and(|max| cycles >= max) {
            return Ok(cycles);
        }
        let tick_start = Instant::now();

        if let Err(e) = entity.update() {
            warn!("Update of {} failed: {}", entity.name(), e);
        }
        publish_pending(entity, refreshes)?;
        publish(entity)?;
        cycles += 1;

        // Maintain steady cadence
        let elapsed = tick_start.elapsed();
        if elapsed < interval && max_cycles.is_none_or(|max| cycles < max) {
            thread::sleep(interval - elapsed);
        }
    }
}

/// Drain `refreshes` and publish once if anything was pending.
///
/// The receiver is paired with this entity's notifier: every request on it
/// counts, and one naming another entity is logged rather than dropped silently.
pub fn publish_pending<E: ClimateEntity>(entity: &E, refreshes: &Receiver<RefreshRequest>) -> Result<usize, String> {
    let mut pending = 0;
    for request in refreshes.try_iter() {
        if request.entity != entity.name() {
            warn!(
                "Refresh for {} arrived on the channel of {}; publishing {}",
                request.entity,
                entity.name(),
                entity.name()
            );
        }
        pending += 1;
    }
    if pending > 0 {
        publish(entity)?;
    }
    Ok(pending)
}

fn publish<E: ClimateEntity>(entity: &E) -> Result<(), String> {
    let json = serde_json::to_string(&entity.state())
        .map_err(|e| format!("serialising state of {} failed: {}", entity.name(), e))?;
    info!("State {}: {}", entity.name(), json);
    Ok(())
}
