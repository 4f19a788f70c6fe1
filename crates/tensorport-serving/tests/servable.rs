use std::sync::mpsc;
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use tensorport_api::v1 as api;
use tensorport_core::{DType, Error, LabelProvider, ModelDescriptor, TensorDescriptor};
use tensorport_serving::{
    EmbeddedRequestProvider, EmbeddedResponseProvider, InferMetrics, InferPayload, InferStats,
    OnComplete, RequestProvider, ResponseProvider, Servable, StandardRunFn, StandardScheduler,
};

fn descriptor() -> ModelDescriptor {
    ModelDescriptor {
        name: "echo".to_string(),
        inputs: vec![TensorDescriptor::new("data", DType::U8, &[8])],
        outputs: vec![
            TensorDescriptor::new("copy", DType::U8, &[8]),
            TensorDescriptor::new("extra", DType::U8, &[8]),
        ],
        max_batch: 4,
    }
}

fn servable() -> Arc<Servable> {
    Arc::new(Servable::new(
        descriptor(),
        1,
        LabelProvider::new(),
        Arc::new(InferMetrics::default()),
    ))
}

fn request(outputs: &[&str]) -> api::InferRequest {
    api::InferRequest {
        model_name: "echo".to_string(),
        model_version: 1,
        meta_data: Some(api::InferRequestHeader {
            batch_size: 1,
            input: vec![api::RequestInput {
                name: "data".to_string(),
                dims: Vec::new(),
                batch_byte_size: 8,
            }],
            output: outputs
                .iter()
                .map(|name| api::RequestOutput {
                    name: name.to_string(),
                    cls: None,
                })
                .collect(),
        }),
        raw_input: vec![Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8])],
    }
}

/// A run function that copies the input into every model output it is
/// asked for, without consulting `requires_output` first.
fn copy_all_outputs(sv: Arc<Servable>, produce: Vec<&'static str>) -> StandardRunFn {
    Arc::new(move |_runner, payload: &mut InferPayload| {
        let content = payload
            .request
            .next_input_content(0, true)?
            .ok_or_else(|| Error::internal("input exhausted before compute"))?;
        for name in &produce {
            let buffer = payload.response.output_buffer(name, content.len(), &[1, 8])?;
            buffer.copy_from_slice(&content);
        }
        payload.response.finalize(&sv)
    })
}

fn noop_on_complete() -> OnComplete {
    Box::new(|_status, _payload| {})
}

#[test]
fn scheduler_installs_exactly_once() {
    let sv = servable();
    let run: StandardRunFn = Arc::new(|_: u32, _: &mut InferPayload| Ok(()));
    sv.set_scheduler(Box::new(StandardScheduler::new(1, run.clone())))
        .expect("first install");
    let err = sv
        .set_scheduler(Box::new(StandardScheduler::new(1, run)))
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[test]
fn descriptor_lookup_fails_not_found_for_unknown_names() {
    let sv = servable();
    assert_eq!(sv.input("data").expect("known input").name.0, "data");
    assert!(matches!(sv.input("bogus"), Err(Error::NotFound(_))));
    assert!(matches!(sv.output("bogus"), Err(Error::NotFound(_))));
}

#[test]
fn run_blocks_until_completion_and_returns_the_terminal_status() -> Result<()> {
    let sv = servable();
    sv.set_configured_scheduler(2, copy_all_outputs(sv.clone(), vec!["copy"]))?;

    let provider = EmbeddedRequestProvider::new(sv.descriptor(), request(&["copy"]))?;
    let header = provider.request_header().clone();
    let response = EmbeddedResponseProvider::new(sv.name(), sv.version(), &header);

    let (tx, rx) = mpsc::channel();
    let mut stats = InferStats::new(-1);
    stats.set_batch_size(1);
    let status = sv.run(
        stats,
        Box::new(provider),
        Box::new(response),
        Box::new(move |status, payload| {
            let _ = tx.send((status, payload.response.response_header().clone()));
        }),
    );
    assert!(status.is_ok());

    // The callback has already fired by the time run returns.
    let (terminal, header) = rx.try_recv()?;
    assert!(terminal.is_ok());
    assert_eq!(header.output.len(), 1);
    assert_eq!(header.output[0].name, "copy");
    Ok(())
}

#[test]
fn run_async_without_a_scheduler_fails_unavailable() {
    let sv = servable();
    let (tx, rx) = mpsc::channel();
    let provider =
        EmbeddedRequestProvider::new(sv.descriptor(), request(&["copy"])).expect("provider");
    let header = provider.request_header().clone();
    let response = EmbeddedResponseProvider::new(sv.name(), sv.version(), &header);

    sv.run_async(
        InferStats::new(-1),
        Box::new(provider),
        Box::new(response),
        Box::new(move |status, _payload| {
            let _ = tx.send(status);
        }),
    );
    let status = rx.recv().expect("callback fired");
    assert!(matches!(status, Err(Error::Unavailable(_))));
}

#[test]
fn a_failing_request_leaves_concurrent_requests_unaffected() -> Result<()> {
    let sv = servable();
    // Sloppy compute: produces both model outputs without checking the
    // requested set, so a request that asked for only one must fail.
    sv.set_configured_scheduler(2, copy_all_outputs(sv.clone(), vec!["copy", "extra"]))?;

    let (tx_ok, rx_ok) = mpsc::channel();
    let (tx_bad, rx_bad) = mpsc::channel();

    let provider =
        EmbeddedRequestProvider::new(sv.descriptor(), request(&["copy", "extra"]))?;
    let header = provider.request_header().clone();
    let response = EmbeddedResponseProvider::new(sv.name(), sv.version(), &header);
    sv.run_async(
        InferStats::new(-1),
        Box::new(provider),
        Box::new(response),
        Box::new(move |status, payload| {
            let _ = tx_ok.send((status, payload.response.response_header().output.len()));
        }),
    );

    let provider = EmbeddedRequestProvider::new(sv.descriptor(), request(&["copy"]))?;
    let header = provider.request_header().clone();
    let response = EmbeddedResponseProvider::new(sv.name(), sv.version(), &header);
    sv.run_async(
        InferStats::new(-1),
        Box::new(provider),
        Box::new(response),
        Box::new(move |status, _payload| {
            let _ = tx_bad.send(status);
        }),
    );

    let bad = rx_bad.recv().expect("failing request completes");
    assert!(matches!(bad, Err(Error::InvalidArgument(_))));

    let (ok, produced) = rx_ok.recv().expect("good request completes");
    assert!(ok.is_ok());
    assert_eq!(produced, 2);
    Ok(())
}

#[test]
fn per_device_metric_series_are_distinct_and_cached() {
    let sv = servable();

    sv.metric_inference_success(3).inc();
    sv.metric_inference_success(3).inc();
    assert_eq!(sv.metric_inference_success(3).get(), 2.0);
    // The aggregate series is a different child.
    assert_eq!(sv.metric_inference_success(-1).get(), 0.0);

    sv.metric_inference_load_ratio(3).observe(1.5);
    assert_eq!(sv.metric_inference_load_ratio(3).get_sample_count(), 1);
    assert_eq!(sv.metric_inference_load_ratio(-1).get_sample_count(), 0);
}

#[test]
fn completed_requests_publish_metrics_for_their_device() -> Result<()> {
    let sv = servable();
    sv.set_configured_scheduler(1, copy_all_outputs(sv.clone(), vec!["copy"]))?;

    let provider = EmbeddedRequestProvider::new(sv.descriptor(), request(&["copy"]))?;
    let header = provider.request_header().clone();
    let response = EmbeddedResponseProvider::new(sv.name(), sv.version(), &header);
    let mut stats = InferStats::new(0);
    stats.set_batch_size(1);
    sv.run(stats, Box::new(provider), Box::new(response), noop_on_complete())?;

    assert_eq!(sv.metric_inference_success(0).get(), 1.0);
    assert_eq!(sv.metric_inference_execution_count(0).get(), 1.0);
    assert_eq!(sv.metric_inference_failure(0).get(), 0.0);
    assert_eq!(sv.metric_inference_success(-1).get(), 0.0);
    Ok(())
}
