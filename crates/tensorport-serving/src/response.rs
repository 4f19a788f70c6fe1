use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use prost::Message;
use tensorport_api::v1 as api;
use tensorport_core::{Error, Result};

use crate::Servable;

/// Transport-agnostic access to the outputs of one inference response.
///
/// The compute path asks for output buffers by name and writes raw
/// result bytes into them; `finalize` then walks the produced outputs
/// in first-call order and completes the response header exactly once.
pub trait ResponseProvider: Send {
    fn response_header(&self) -> &api::InferResponseHeader;

    fn response_header_mut(&mut self) -> &mut api::InferResponseHeader;

    /// True iff `name` is in the request's requested-output set. Lets
    /// the compute path skip producing expensive unrequested outputs.
    fn requires_output(&self, name: &str) -> bool;

    /// Writable buffer of exactly `byte_size` bytes for the named
    /// output. The name must be in the requested-output set and may be
    /// produced at most once.
    fn output_buffer(&mut self, name: &str, byte_size: usize, shape: &[i64])
        -> Result<&mut [u8]>;

    /// Complete the response header from the produced outputs, applying
    /// classification post-processing through the servable's label
    /// provider. Runs at most once, and only succeeds once every
    /// requested output has been produced.
    fn finalize(&mut self, servable: &Servable) -> Result<()>;
}

/// One produced output in first-call order.
struct Output {
    name: String,
    shape: Vec<i64>,
    byte_size: usize,
    /// Owned scratch for buffered outputs. Raw outputs of the embedded
    /// variant live in the outbound message instead.
    buffer: Option<Vec<u8>>,
}

/// State both provider variants share: the requested-output map, the
/// append-only output ledger, and the finalize walk.
struct ResponseBuilder {
    header: api::InferResponseHeader,
    requested: HashMap<String, Option<api::ClassParam>>,
    outputs: Vec<Output>,
    finalized: bool,
}

impl ResponseBuilder {
    fn new(model_name: &str, model_version: i64, request_header: &api::InferRequestHeader) -> Self {
        let requested = request_header
            .output
            .iter()
            .map(|o| (o.name.clone(), o.cls.clone()))
            .collect();
        Self {
            header: api::InferResponseHeader {
                model_name: model_name.to_string(),
                model_version,
                batch_size: request_header.batch_size,
                output: Vec::new(),
            },
            requested,
            outputs: Vec::new(),
            finalized: false,
        }
    }

    fn requires_output(&self, name: &str) -> bool {
        self.requested.contains_key(name)
    }

    /// Validate and record one produced output. Returns the ledger
    /// index and whether the entry owns scratch storage.
    fn push_output(
        &mut self,
        name: &str,
        byte_size: usize,
        shape: &[i64],
        buffer_raw: bool,
    ) -> Result<(usize, bool)> {
        if self.finalized {
            return Err(Error::internal(format!(
                "output '{name}' produced after response finalize"
            )));
        }
        let Some(cls) = self.requested.get(name) else {
            return Err(Error::invalid_argument(format!(
                "output '{name}' was not requested"
            )));
        };
        if self.outputs.iter().any(|o| o.name == name) {
            return Err(Error::already_exists(format!(
                "output '{name}' was already produced"
            )));
        }

        // Classification outputs are always staged in owned scratch:
        // finalize consumes the raw scores instead of shipping them.
        let buffered = buffer_raw || cls.is_some();
        self.outputs.push(Output {
            name: name.to_string(),
            shape: shape.to_vec(),
            byte_size,
            buffer: buffered.then(|| vec![0u8; byte_size]),
        });
        Ok((self.outputs.len() - 1, buffered))
    }

    fn scratch_mut(&mut self, idx: usize) -> Result<&mut [u8]> {
        self.outputs
            .get_mut(idx)
            .and_then(|o| o.buffer.as_deref_mut())
            .ok_or_else(|| Error::internal(format!("output ledger entry {idx} has no scratch")))
    }

    fn finalize(&mut self, servable: &Servable) -> Result<()> {
        if self.finalized {
            return Err(Error::internal("response was already finalized"));
        }
        for name in self.requested.keys() {
            if !self.outputs.iter().any(|o| &o.name == name) {
                return Err(Error::internal(format!(
                    "requested output '{name}' was never produced"
                )));
            }
        }

        let batch_size = self.header.batch_size.max(1) as usize;
        let mut entries = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            let cls = self.requested.get(&output.name).cloned().flatten();
            let entry = match cls {
                Some(param) => api::ResponseOutput {
                    name: output.name.clone(),
                    raw: None,
                    batch_classes: classify(servable, output, batch_size, param.count)?,
                },
                None => api::ResponseOutput {
                    name: output.name.clone(),
                    raw: Some(api::OutputRaw {
                        dims: output.shape.clone(),
                        batch_byte_size: output.byte_size as u64,
                    }),
                    batch_classes: Vec::new(),
                },
            };
            entries.push(entry);
        }
        self.header.output = entries;
        self.finalized = true;
        Ok(())
    }
}

/// Top-k selection over buffered f32 scores, one class list per batch
/// item. Ties break toward the lower class index.
fn classify(
    servable: &Servable,
    output: &Output,
    batch_size: usize,
    count: u32,
) -> Result<Vec<api::ClassList>> {
    let buffer = output.buffer.as_deref().ok_or_else(|| {
        Error::internal(format!(
            "classification output '{}' has no buffered scores",
            output.name
        ))
    })?;
    if output.byte_size % (batch_size * 4) != 0 {
        return Err(Error::internal(format!(
            "output '{}' byte size {} does not divide into f32 scores for batch size {}",
            output.name, output.byte_size, batch_size
        )));
    }
    let per_item = output.byte_size / (batch_size * 4);

    let mut lists = Vec::with_capacity(batch_size);
    for item in 0..batch_size {
        let base = item * per_item * 4;
        let mut scored: Vec<(usize, f32)> = (0..per_item)
            .map(|i| {
                let at = base + i * 4;
                let value =
                    f32::from_le_bytes([buffer[at], buffer[at + 1], buffer[at + 2], buffer[at + 3]]);
                (i, value)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let take = (count as usize).min(per_item);
        lists.push(api::ClassList {
            cls: scored[..take]
                .iter()
                .map(|(idx, value)| api::ClassEntry {
                    idx: *idx as u32,
                    value: *value,
                    label: servable.label_provider().label(&output.name, *idx).to_string(),
                })
                .collect(),
        });
    }
    Ok(lists)
}

/// Response provider writing into an embedded outbound message.
///
/// Raw output buffers are fields of the message itself, so raw results
/// need no extra copy; the finalized message is handed back to the
/// frontend with `into_response`.
pub struct EmbeddedResponseProvider {
    builder: ResponseBuilder,
    response: api::InferResponse,
}

impl EmbeddedResponseProvider {
    pub fn new(
        model_name: &str,
        model_version: i64,
        request_header: &api::InferRequestHeader,
    ) -> Self {
        Self {
            builder: ResponseBuilder::new(model_name, model_version, request_header),
            response: api::InferResponse::default(),
        }
    }

    /// The finalized outbound message: header plus raw output blobs in
    /// header order.
    pub fn into_response(self) -> Result<api::InferResponse> {
        if !self.builder.finalized {
            return Err(Error::internal("response is not finalized"));
        }
        let mut response = self.response;
        response.meta_data = Some(self.builder.header);
        Ok(response)
    }
}

impl ResponseProvider for EmbeddedResponseProvider {
    fn response_header(&self) -> &api::InferResponseHeader {
        &self.builder.header
    }

    fn response_header_mut(&mut self) -> &mut api::InferResponseHeader {
        &mut self.builder.header
    }

    fn requires_output(&self, name: &str) -> bool {
        self.builder.requires_output(name)
    }

    fn output_buffer(
        &mut self,
        name: &str,
        byte_size: usize,
        shape: &[i64],
    ) -> Result<&mut [u8]> {
        let (idx, buffered) = self.builder.push_output(name, byte_size, shape, false)?;
        if buffered {
            return self.builder.scratch_mut(idx);
        }
        self.response.raw_output.push(vec![0u8; byte_size]);
        match self.response.raw_output.last_mut() {
            Some(buffer) => Ok(buffer.as_mut_slice()),
            None => Err(Error::internal("outbound message lost its output buffer")),
        }
    }

    fn finalize(&mut self, servable: &Servable) -> Result<()> {
        self.builder.finalize(servable)
    }
}

/// Response provider for a raw streaming transport.
///
/// Every output is staged in owned scratch; finalize serializes the
/// length-delimited header followed by the raw output bytes, in header
/// order with no per-tensor length prefix, into one outbound buffer.
/// Receivers slice it using the header-declared byte sizes.
pub struct StreamingResponseProvider {
    builder: ResponseBuilder,
    outbound: Option<Bytes>,
}

impl StreamingResponseProvider {
    pub fn new(
        model_name: &str,
        model_version: i64,
        request_header: &api::InferRequestHeader,
    ) -> Self {
        Self {
            builder: ResponseBuilder::new(model_name, model_version, request_header),
            outbound: None,
        }
    }

    /// The serialized outbound buffer. Available exactly once, after
    /// finalize.
    pub fn take_output_buffer(&mut self) -> Result<Bytes> {
        self.outbound
            .take()
            .ok_or_else(|| Error::internal("response is not finalized"))
    }
}

impl ResponseProvider for StreamingResponseProvider {
    fn response_header(&self) -> &api::InferResponseHeader {
        &self.builder.header
    }

    fn response_header_mut(&mut self) -> &mut api::InferResponseHeader {
        &mut self.builder.header
    }

    fn requires_output(&self, name: &str) -> bool {
        self.builder.requires_output(name)
    }

    fn output_buffer(
        &mut self,
        name: &str,
        byte_size: usize,
        shape: &[i64],
    ) -> Result<&mut [u8]> {
        let (idx, _) = self.builder.push_output(name, byte_size, shape, true)?;
        self.builder.scratch_mut(idx)
    }

    fn finalize(&mut self, servable: &Servable) -> Result<()> {
        self.builder.finalize(servable)?;

        let raw_total: usize = self
            .builder
            .outputs
            .iter()
            .filter_map(|o| o.buffer.as_ref().map(Vec::len))
            .sum();
        let mut buf = BytesMut::with_capacity(self.builder.header.encoded_len() + raw_total + 8);
        self.builder
            .header
            .encode_length_delimited(&mut buf)
            .map_err(|e| Error::internal(format!("failed to encode response header: {e}")))?;
        for (output, entry) in self.builder.outputs.iter().zip(&self.builder.header.output) {
            if entry.raw.is_none() {
                continue;
            }
            let scratch = output.buffer.as_deref().ok_or_else(|| {
                Error::internal(format!("raw output '{}' has no scratch", output.name))
            })?;
            buf.put_slice(scratch);
        }
        self.outbound = Some(buf.freeze());
        Ok(())
    }
}
