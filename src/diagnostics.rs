use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::types::RenderType;

const REPORT_INTERVAL: u64 = 100;

/// Counters for the most recently *completed* frame. Replaced wholesale when
/// the device signals completion, never partially updated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub gpu_time_nanos: u64,
    pub draw_calls: u32,
    pub vertices: u64,
    pub rt_draw_calls: [u32; RenderType::COUNT],
    pub rt_vertices: [u64; RenderType::COUNT],
}

/// Per-frame accumulation, owned by the open frame session and handed to the
/// completion callback at submit.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct PendingFrame {
    pub draw_calls: u32,
    pub vertices: u64,
    pub rt_draw_calls: [u32; RenderType::COUNT],
    pub rt_vertices: [u64; RenderType::COUNT],
    pub rendered: [bool; RenderType::COUNT],
}

impl PendingFrame {
    pub fn record(&mut self, rt: RenderType, draw_calls: u32, vertices: u64) {
        let i = rt.index();
        self.rendered[i] = true;
        self.rt_draw_calls[i] = draw_calls;
        self.rt_vertices[i] = vertices;
        self.draw_calls += draw_calls;
        self.vertices += vertices;
    }
}

#[derive(Debug, Default)]
struct CollectorState {
    snapshot: DiagnosticsSnapshot,
    completed_frames: u64,
    accum_gpu_nanos: u128,
    accum_draw_calls: u64,
    accum_vertices: u128,
}

/// Shared sink for completed-frame stats. GPU execution finishes after
/// `end_frame` returns, so completion callbacks publish from whatever thread
/// the device polls on; readers always see either the previous frame or the
/// new one, never a mix.
#[derive(Clone, Debug, Default)]
pub(crate) struct DiagnosticsCollector {
    state: Arc<Mutex<CollectorState>>,
}

impl DiagnosticsCollector {
    /// Counters stay readable even if a completion callback panicked while
    /// holding the lock; stats are plain data and cannot be left torn in a
    /// way worth crashing over.
    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.lock().snapshot
    }

    pub fn publish(&self, pending: &PendingFrame, gpu_time_nanos: u64) {
        let mut state = self.lock();
        state.snapshot = DiagnosticsSnapshot {
            gpu_time_nanos,
            draw_calls: pending.draw_calls,
            vertices: pending.vertices,
            rt_draw_calls: pending.rt_draw_calls,
            rt_vertices: pending.rt_vertices,
        };
        state.completed_frames += 1;
        state.accum_gpu_nanos += gpu_time_nanos as u128;
        state.accum_draw_calls += pending.draw_calls as u64;
        state.accum_vertices += pending.vertices as u128;

        if state.completed_frames % REPORT_INTERVAL == 0 {
            let frames = REPORT_INTERVAL as f64;
            log::debug!(
                "terrain: {} frames avg {:.3} ms gpu, {:.1} draws, {:.0} vertices",
                REPORT_INTERVAL,
                state.accum_gpu_nanos as f64 / frames / 1_000_000.0,
                state.accum_draw_calls as f64 / frames,
                state.accum_vertices as f64 / frames,
            );
            state.accum_gpu_nanos = 0;
            state.accum_draw_calls = 0;
            state.accum_vertices = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_replaces_the_snapshot_wholesale() {
        let collector = DiagnosticsCollector::default();
        assert_eq!(collector.snapshot(), DiagnosticsSnapshot::default());

        let mut frame = PendingFrame::default();
        frame.record(RenderType::Solid, 1, 150);
        frame.record(RenderType::Translucent, 1, 40);
        collector.publish(&frame, 2_500_000);

        let snap = collector.snapshot();
        assert_eq!(snap.gpu_time_nanos, 2_500_000);
        assert_eq!(snap.draw_calls, 2);
        assert_eq!(snap.vertices, 190);
        assert_eq!(snap.rt_draw_calls[RenderType::Solid.index()], 1);
        assert_eq!(snap.rt_vertices[RenderType::Translucent.index()], 40);

        // A later empty frame wipes the previous numbers.
        collector.publish(&PendingFrame::default(), 0);
        assert_eq!(collector.snapshot(), DiagnosticsSnapshot::default());
    }

    #[test]
    fn reads_and_publishes_survive_a_poisoned_lock() {
        let collector = DiagnosticsCollector::default();
        let mut frame = PendingFrame::default();
        frame.record(RenderType::Solid, 1, 12);
        collector.publish(&frame, 99);

        let poisoner = collector.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the diagnostics lock");
        })
        .join();

        assert_eq!(collector.snapshot().vertices, 12);
        collector.publish(&PendingFrame::default(), 0);
        assert_eq!(collector.snapshot(), DiagnosticsSnapshot::default());
    }

    #[test]
    fn snapshot_is_stable_until_the_next_completion() {
        let collector = DiagnosticsCollector::default();
        let mut frame = PendingFrame::default();
        frame.record(RenderType::Cutout, 1, 8);
        collector.publish(&frame, 10);
        let a = collector.snapshot();
        let b = collector.snapshot();
        assert_eq!(a, b);
    }
}
