//! Per-model inference metric families.
//!
//! Families are labelled {model, version, device}; the device label
//! "-1" is the aggregate series, any other value one accelerator's
//! series. Children resolve through the metric vec's atomic
//! get-or-create, so concurrent first access for the same device key
//! yields exactly one series.

use prometheus::{
    Counter, CounterVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
};

use crate::InferStats;

const LABELS: [&str; 3] = ["model", "version", "device"];

#[derive(Clone, Debug)]
pub struct InferMetrics {
    pub inference_success: CounterVec,
    pub inference_failure: CounterVec,
    pub inference_count: CounterVec,
    pub inference_execution_count: CounterVec,
    pub inference_request_duration_us: CounterVec,
    pub inference_compute_duration_us: CounterVec,
    pub inference_queue_duration_us: CounterVec,
    pub inference_load_ratio: HistogramVec,
}

impl InferMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            inference_success: CounterVec::new(
                Opts::new(
                    "tensorport_inference_success_total",
                    "Successful inference requests",
                ),
                &LABELS,
            )?,
            inference_failure: CounterVec::new(
                Opts::new(
                    "tensorport_inference_failure_total",
                    "Failed inference requests",
                ),
                &LABELS,
            )?,
            inference_count: CounterVec::new(
                Opts::new(
                    "tensorport_inference_count_total",
                    "Inferences performed (a batch counts as batch-size inferences)",
                ),
                &LABELS,
            )?,
            inference_execution_count: CounterVec::new(
                Opts::new(
                    "tensorport_inference_execution_count_total",
                    "Model executions performed",
                ),
                &LABELS,
            )?,
            inference_request_duration_us: CounterVec::new(
                Opts::new(
                    "tensorport_inference_request_duration_us_total",
                    "Cumulative end-to-end request duration in microseconds",
                ),
                &LABELS,
            )?,
            inference_compute_duration_us: CounterVec::new(
                Opts::new(
                    "tensorport_inference_compute_duration_us_total",
                    "Cumulative compute duration in microseconds",
                ),
                &LABELS,
            )?,
            inference_queue_duration_us: CounterVec::new(
                Opts::new(
                    "tensorport_inference_queue_duration_us_total",
                    "Cumulative queue duration in microseconds",
                ),
                &LABELS,
            )?,
            inference_load_ratio: HistogramVec::new(
                HistogramOpts::new(
                    "tensorport_inference_load_ratio",
                    "Request duration over compute duration",
                )
                .buckets(vec![1.05, 1.10, 1.25, 1.50, 2.0, 10.0, 50.0]),
                &LABELS,
            )?,
        })
    }

    /// Register all families with the given registry.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.inference_success.clone()))?;
        registry.register(Box::new(self.inference_failure.clone()))?;
        registry.register(Box::new(self.inference_count.clone()))?;
        registry.register(Box::new(self.inference_execution_count.clone()))?;
        registry.register(Box::new(self.inference_request_duration_us.clone()))?;
        registry.register(Box::new(self.inference_compute_duration_us.clone()))?;
        registry.register(Box::new(self.inference_queue_duration_us.clone()))?;
        registry.register(Box::new(self.inference_load_ratio.clone()))?;
        Ok(())
    }

    /// Resolve the child series set for one (model, version, device).
    pub fn series(&self, model: &str, version: &str, device: i64) -> InferMetricSet {
        let device_label = device.to_string();
        let values = [model, version, device_label.as_str()];
        InferMetricSet {
            success: self.inference_success.with_label_values(&values),
            failure: self.inference_failure.with_label_values(&values),
            count: self.inference_count.with_label_values(&values),
            execution_count: self.inference_execution_count.with_label_values(&values),
            request_duration_us: self.inference_request_duration_us.with_label_values(&values),
            compute_duration_us: self.inference_compute_duration_us.with_label_values(&values),
            queue_duration_us: self.inference_queue_duration_us.with_label_values(&values),
            load_ratio: self.inference_load_ratio.with_label_values(&values),
        }
    }
}

impl Default for InferMetrics {
    fn default() -> Self {
        Self::new().expect("failed to create inference metrics")
    }
}

/// The resolved children one request reports to.
#[derive(Clone)]
pub struct InferMetricSet {
    pub success: Counter,
    pub failure: Counter,
    pub count: Counter,
    pub execution_count: Counter,
    pub request_duration_us: Counter,
    pub compute_duration_us: Counter,
    pub queue_duration_us: Counter,
    pub load_ratio: Histogram,
}

impl InferMetricSet {
    /// Publish one completed request. Failures bump only the failure
    /// counter; durations are reported for successful requests.
    pub fn record(&self, stats: &InferStats) {
        if stats.failed() {
            self.failure.inc();
            return;
        }
        self.success.inc();
        self.count.inc_by(stats.batch_size().max(1) as f64);
        self.execution_count.inc();

        let request_us = stats.request_duration_us();
        let compute_us = stats.compute_duration_us();
        self.request_duration_us.inc_by(request_us as f64);
        self.compute_duration_us.inc_by(compute_us as f64);
        self.queue_duration_us.inc_by(stats.queue_duration_us() as f64);
        if compute_us > 0 {
            self.load_ratio.observe(request_us as f64 / compute_us as f64);
        }
    }
}
