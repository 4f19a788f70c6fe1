use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use prometheus::{Counter, CounterVec, Histogram};
use tensorport_core::{Error, LabelProvider, ModelDescriptor, Result, TensorDescriptor};
use tokio::sync::oneshot;
use tracing::info;

use crate::{
    InferMetricSet, InferMetrics, InferPayload, InferStats, OnComplete, RequestProvider,
    ResponseProvider, Scheduler, StandardRunFn, StandardScheduler,
};

/// The per-model/version serving object: descriptor, label provider,
/// one scheduler, and per-device metric series.
///
/// Many caller threads may run requests concurrently on one servable;
/// each request carries its own provider pair and no cross-request
/// state is shared.
pub struct Servable {
    descriptor: ModelDescriptor,
    version: i64,
    version_label: String,
    label_provider: Arc<LabelProvider>,
    scheduler: OnceLock<Box<dyn Scheduler>>,
    inputs: HashMap<String, TensorDescriptor>,
    outputs: HashMap<String, TensorDescriptor>,
    metrics: Arc<InferMetrics>,
}

impl Servable {
    pub fn new(
        descriptor: ModelDescriptor,
        version: i64,
        label_provider: LabelProvider,
        metrics: Arc<InferMetrics>,
    ) -> Self {
        let inputs = descriptor
            .inputs
            .iter()
            .map(|t| (t.name.0.clone(), t.clone()))
            .collect();
        let outputs = descriptor
            .outputs
            .iter()
            .map(|t| (t.name.0.clone(), t.clone()))
            .collect();
        Self {
            version_label: version.to_string(),
            descriptor,
            version,
            label_provider: Arc::new(label_provider),
            scheduler: OnceLock::new(),
            inputs,
            outputs,
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn label_provider(&self) -> &LabelProvider {
        &self.label_provider
    }

    /// Declared configuration for a named input.
    pub fn input(&self, name: &str) -> Result<&TensorDescriptor> {
        self.inputs.get(name).ok_or_else(|| {
            Error::not_found(format!("unknown input '{}' for model '{}'", name, self.name()))
        })
    }

    /// Declared configuration for a named output.
    pub fn output(&self, name: &str) -> Result<&TensorDescriptor> {
        self.outputs.get(name).ok_or_else(|| {
            Error::not_found(format!("unknown output '{}' for model '{}'", name, self.name()))
        })
    }

    /// Install the scheduler. A servable accepts exactly one scheduler
    /// for its lifetime; a second install fails.
    pub fn set_scheduler(&self, scheduler: Box<dyn Scheduler>) -> Result<()> {
        self.scheduler.set(scheduler).map_err(|_| {
            Error::already_exists(format!(
                "scheduler is already set for model '{}'",
                self.name()
            ))
        })?;
        info!(model = self.name(), version = self.version, "scheduler installed");
        Ok(())
    }

    /// Build and install a standard runner-pool scheduler driving
    /// `on_run` on `runner_cnt` runners (clamped to at least one).
    pub fn set_configured_scheduler(&self, runner_cnt: u32, on_run: StandardRunFn) -> Result<()> {
        self.set_scheduler(Box::new(StandardScheduler::new(runner_cnt, on_run)))
    }

    /// Synchronous facade for frontends that want to block: enqueues,
    /// waits until the completion callback has fired, and returns the
    /// terminal status. Must be called from a thread the scheduler does
    /// not need to make progress; a runner calling back into `run`
    /// would wait on itself.
    pub fn run(
        &self,
        stats: InferStats,
        request: Box<dyn RequestProvider>,
        response: Box<dyn ResponseProvider>,
        on_complete: OnComplete,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let wrapped: OnComplete = Box::new(move |status, payload| {
            let terminal = status.clone();
            on_complete(status, payload);
            let _ = tx.send(terminal);
        });
        self.run_async(stats, request, response, wrapped);
        rx.blocking_recv()
            .map_err(|_| Error::internal("completion callback was dropped without firing"))?
    }

    /// Asynchronous entry point: enqueue and return immediately. The
    /// completion callback fires later, not necessarily on the
    /// caller's thread, after the request's metrics have been
    /// published.
    pub fn run_async(
        &self,
        stats: InferStats,
        request: Box<dyn RequestProvider>,
        response: Box<dyn ResponseProvider>,
        on_complete: OnComplete,
    ) {
        let series = self.metric_series(stats.device());
        let wrapped: OnComplete = Box::new(move |status, mut payload| {
            if status.is_err() {
                payload.stats.set_failed(true);
            }
            series.record(&payload.stats);
            on_complete(status, payload);
        });

        let payload = InferPayload {
            stats,
            request,
            response,
        };
        match self.scheduler.get() {
            Some(scheduler) => scheduler.enqueue(payload, wrapped),
            None => wrapped(
                Err(Error::unavailable(format!(
                    "no scheduler installed for model '{}'",
                    self.name()
                ))),
                payload,
            ),
        }
    }

    fn metric_series(&self, device: i64) -> InferMetricSet {
        self.metrics.series(self.name(), &self.version_label, device)
    }

    fn counter(&self, vec: &CounterVec, device: i64) -> Counter {
        let device_label = device.to_string();
        vec.with_label_values(&[self.name(), &self.version_label, &device_label])
    }

    // Metric accessors, specialized by device index; -1 selects the
    // aggregate series. Children are created on first use and cached
    // by the underlying vec, so repeated calls return the same series.

    pub fn metric_inference_success(&self, device: i64) -> Counter {
        self.counter(&self.metrics.inference_success, device)
    }

    pub fn metric_inference_failure(&self, device: i64) -> Counter {
        self.counter(&self.metrics.inference_failure, device)
    }

    pub fn metric_inference_count(&self, device: i64) -> Counter {
        self.counter(&self.metrics.inference_count, device)
    }

    pub fn metric_inference_execution_count(&self, device: i64) -> Counter {
        self.counter(&self.metrics.inference_execution_count, device)
    }

    pub fn metric_inference_request_duration_us(&self, device: i64) -> Counter {
        self.counter(&self.metrics.inference_request_duration_us, device)
    }

    pub fn metric_inference_compute_duration_us(&self, device: i64) -> Counter {
        self.counter(&self.metrics.inference_compute_duration_us, device)
    }

    pub fn metric_inference_queue_duration_us(&self, device: i64) -> Counter {
        self.counter(&self.metrics.inference_queue_duration_us, device)
    }

    pub fn metric_inference_load_ratio(&self, device: i64) -> Histogram {
        let device_label = device.to_string();
        self.metrics
            .inference_load_ratio
            .with_label_values(&[self.name(), &self.version_label, &device_label])
    }
}
