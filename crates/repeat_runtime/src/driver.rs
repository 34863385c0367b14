//! Async frame driver.
//!
//! Hosts without a native frame loop can hand a repeat to [`drive_frames`],
//! which delivers queued frame requests on a fixed tokio interval.

use crate::host::ViewHost;
use crate::repeat::{IndexedRepeat, SyncStatus};
use crate::scheduler::FrameQueue;
use repeat_core::{Clock, CoreResult};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

/// Deliver queued frames every `period` until the pass in flight completes
///
/// Returns the number of frames delivered.
///
/// # Errors
///
/// Returns the error of a failed step; the pass is aborted by then
pub async fn drive_frames<T, H, C>(
    repeat: &mut IndexedRepeat<T, H, C, FrameQueue>,
    period: Duration,
) -> CoreResult<usize>
where
    T: Clone,
    H: ViewHost<T>,
    C: Clock,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut delivered = 0;
    while repeat.is_synchronizing() {
        interval.tick().await;
        let Some(ticket) = repeat.frames_mut().pop() else {
            break;
        };
        delivered += 1;
        if repeat.on_animation_frame(ticket)? == SyncStatus::Complete {
            break;
        }
    }
    debug!(delivered, "frame driver finished");
    Ok(delivered)
}
