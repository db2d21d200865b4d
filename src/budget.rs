use std::time::{Duration, Instant};

/// Default per-frame upload budget: ~18% of a 16.67ms frame at 60fps.
pub const DEFAULT_UPLOAD_BUDGET: Duration = Duration::from_millis(3);

/// Always admit at least this many uploads per frame so the pending set
/// cannot grow without bound during sustained heavy chunk compilation.
pub const DEFAULT_MIN_UPLOADS_PER_FRAME: u32 = 4;

/// Budgets chunk uploads to prevent frame spikes.
///
/// Draining every pending mesh in one frame can stall it for tens of
/// milliseconds when many chunks compile at once. Callers ask `try_claim`
/// before each `set_chunk`; once the frame's budget is spent the claim is
/// denied and the upload is deferred to the next frame. A deferred chunk
/// renders with one-frame-stale data, which is invisible in practice.
#[derive(Debug)]
pub struct UploadBudgeter {
    budget: Duration,
    min_per_frame: u32,
    frame_start: Option<Instant>,
    claimed_this_frame: u32,
    exhausted: bool,

    total_uploaded: u64,
    total_deferred: u64,
    frames_with_deferral: u64,
}

impl UploadBudgeter {
    pub fn new(budget: Duration, min_per_frame: u32) -> Self {
        Self {
            budget,
            min_per_frame,
            frame_start: None,
            claimed_this_frame: 0,
            exhausted: false,
            total_uploaded: 0,
            total_deferred: 0,
            frames_with_deferral: 0,
        }
    }

    /// Resets the budget; call once at the start of each frame.
    pub fn begin_frame(&mut self) {
        if self.exhausted {
            self.frames_with_deferral += 1;
        }
        self.frame_start = None;
        self.claimed_this_frame = 0;
        self.exhausted = false;
    }

    /// Whether another upload fits this frame's budget. The clock starts at
    /// the first claim, and the budget is only checked after the guaranteed
    /// minimum has gone through.
    pub fn try_claim(&mut self) -> bool {
        if self.exhausted {
            self.total_deferred += 1;
            return false;
        }
        let start = *self.frame_start.get_or_insert_with(Instant::now);
        if self.claimed_this_frame >= self.min_per_frame && start.elapsed() > self.budget {
            self.exhausted = true;
            self.total_deferred += 1;
            return false;
        }
        self.claimed_this_frame += 1;
        self.total_uploaded += 1;
        true
    }

    pub fn total_uploaded(&self) -> u64 {
        self.total_uploaded
    }

    pub fn total_deferred(&self) -> u64 {
        self.total_deferred
    }

    pub fn frames_with_deferral(&self) -> u64 {
        self.frames_with_deferral
    }
}

impl Default for UploadBudgeter {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_BUDGET, DEFAULT_MIN_UPLOADS_PER_FRAME)
    }
}
