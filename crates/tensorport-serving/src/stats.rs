use std::time::Instant;

/// Per-request timing and outcome capture, carried through the
/// scheduler alongside the provider pair.
///
/// The request clock starts at construction; the scheduler marks the
/// queue and compute interval edges. Durations for intervals that were
/// never entered report as zero.
#[derive(Debug)]
pub struct InferStats {
    device: i64,
    batch_size: usize,
    failed: bool,
    created_at: Instant,
    enqueued_at: Option<Instant>,
    dequeued_at: Option<Instant>,
    compute_done_at: Option<Instant>,
}

impl InferStats {
    /// `device` keys the metric series this request reports to;
    /// -1 selects the aggregate series.
    pub fn new(device: i64) -> Self {
        Self {
            device,
            batch_size: 0,
            failed: false,
            created_at: Instant::now(),
            enqueued_at: None,
            dequeued_at: None,
            compute_done_at: None,
        }
    }

    pub fn device(&self) -> i64 {
        self.device
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn set_failed(&mut self, failed: bool) {
        self.failed = failed;
    }

    pub fn mark_enqueued(&mut self) {
        self.enqueued_at = Some(Instant::now());
    }

    pub fn mark_dequeued(&mut self) {
        self.dequeued_at = Some(Instant::now());
    }

    pub fn mark_compute_done(&mut self) {
        self.compute_done_at = Some(Instant::now());
    }

    pub fn request_duration_us(&self) -> u64 {
        self.created_at.elapsed().as_micros() as u64
    }

    pub fn queue_duration_us(&self) -> u64 {
        interval_us(self.enqueued_at, self.dequeued_at)
    }

    pub fn compute_duration_us(&self) -> u64 {
        interval_us(self.dequeued_at, self.compute_done_at)
    }
}

fn interval_us(start: Option<Instant>, end: Option<Instant>) -> u64 {
    match (start, end) {
        (Some(start), Some(end)) => end.saturating_duration_since(start).as_micros() as u64,
        _ => 0,
    }
}
