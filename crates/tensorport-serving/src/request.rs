use bytes::{Bytes, BytesMut};
use tensorport_api::v1 as api;
use tensorport_core::{Error, ModelDescriptor, Result};

/// Transport-agnostic access to the inputs of one inference request.
///
/// Model name and version are fixed at construction. Input bytes are
/// read per input index as a sequence of chunks; a `force_contiguous`
/// read returns the entire remaining bytes for that input as a single
/// block, copying only if the underlying ranges are not already
/// contiguous.
pub trait RequestProvider: Send {
    fn model_name(&self) -> &str;

    /// Requested model version, or -1 if no specific version was asked for.
    fn model_version(&self) -> i64;

    fn request_header(&self) -> &api::InferRequestHeader;

    /// Next chunk of bytes for input `idx`, or `None` once the input
    /// is exhausted. Over-reads are not an error.
    fn next_input_content(&mut self, idx: usize, force_contiguous: bool)
        -> Result<Option<Bytes>>;
}

fn checked_batch_size(descriptor: &ModelDescriptor, header: &api::InferRequestHeader) -> Result<u32> {
    let batch_size = header.batch_size;
    if batch_size == 0 || batch_size > descriptor.max_batch {
        return Err(Error::invalid_argument(format!(
            "batch size {} is out of range for model '{}' (max {})",
            batch_size, descriptor.name, descriptor.max_batch
        )));
    }
    Ok(batch_size)
}

/// Resolve the descriptor-derived byte size for one requested input and
/// check the request's own declaration against it.
fn checked_batch_byte_size(
    descriptor: &ModelDescriptor,
    input: &api::RequestInput,
    batch_size: u32,
) -> Result<u64> {
    let config = descriptor.input(&input.name).ok_or_else(|| {
        Error::invalid_argument(format!(
            "unknown input '{}' for model '{}'",
            input.name, descriptor.name
        ))
    })?;

    let expected = config.batch_byte_size(batch_size);
    if input.batch_byte_size != 0 && input.batch_byte_size != expected {
        return Err(Error::invalid_argument(format!(
            "input '{}' declares {} bytes, expected {} for batch size {}",
            input.name, input.batch_byte_size, expected, batch_size
        )));
    }
    Ok(expected)
}

/// Request provider over an embedded inference message.
///
/// Input bytes already live contiguously inside the parsed message, so
/// every input is served as exactly one zero-copy chunk.
#[derive(Debug)]
pub struct EmbeddedRequestProvider {
    model_name: String,
    model_version: i64,
    header: api::InferRequestHeader,
    contents: Vec<Bytes>,
    delivered: Vec<bool>,
}

impl EmbeddedRequestProvider {
    pub fn new(descriptor: &ModelDescriptor, mut request: api::InferRequest) -> Result<Self> {
        let header = request
            .meta_data
            .take()
            .ok_or_else(|| Error::invalid_argument("inference request has no header"))?;
        let batch_size = checked_batch_size(descriptor, &header)?;

        if request.raw_input.len() != header.input.len() {
            return Err(Error::invalid_argument(format!(
                "expected {} raw input blobs, got {}",
                header.input.len(),
                request.raw_input.len()
            )));
        }
        for (meta, content) in header.input.iter().zip(&request.raw_input) {
            let expected = checked_batch_byte_size(descriptor, meta, batch_size)?;
            if content.len() as u64 != expected {
                return Err(Error::invalid_argument(format!(
                    "input '{}' holds {} bytes, expected {}",
                    meta.name,
                    content.len(),
                    expected
                )));
            }
        }

        let delivered = vec![false; header.input.len()];
        Ok(Self {
            model_name: request.model_name,
            model_version: request.model_version,
            header,
            contents: request.raw_input,
            delivered,
        })
    }
}

impl RequestProvider for EmbeddedRequestProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn model_version(&self) -> i64 {
        self.model_version
    }

    fn request_header(&self) -> &api::InferRequestHeader {
        &self.header
    }

    fn next_input_content(
        &mut self,
        idx: usize,
        _force_contiguous: bool,
    ) -> Result<Option<Bytes>> {
        let content = self.contents.get(idx).ok_or_else(|| {
            Error::invalid_argument(format!("input index {idx} out of range"))
        })?;
        if std::mem::replace(&mut self.delivered[idx], true) {
            return Ok(None);
        }
        Ok(Some(content.clone()))
    }
}

/// Request provider over a raw multiplexed streaming buffer.
///
/// The transport delivers the request body as a sequence of segments;
/// one logical input may scatter across several of them. Per-input
/// range lists are assembled at construction, and `force_contiguous`
/// reads go through a lazily-built per-input scratch block that is
/// cached for repeated reads.
#[derive(Debug)]
pub struct StreamingRequestProvider {
    model_name: String,
    model_version: i64,
    header: api::InferRequestHeader,
    blocks: Vec<Vec<Bytes>>,
    cursor: Vec<usize>,
    contiguous: Vec<Option<Bytes>>,
}

impl StreamingRequestProvider {
    pub fn new(
        descriptor: &ModelDescriptor,
        model_name: impl Into<String>,
        model_version: i64,
        header: api::InferRequestHeader,
        segments: Vec<Bytes>,
    ) -> Result<Self> {
        let batch_size = checked_batch_size(descriptor, &header)?;

        // Walk the segments once, assigning byte ranges to inputs in
        // header order by each input's declared byte size.
        let mut blocks = Vec::with_capacity(header.input.len());
        let mut seg = 0usize;
        let mut offset = 0usize;
        for meta in &header.input {
            let mut need = checked_batch_byte_size(descriptor, meta, batch_size)? as usize;
            let mut ranges = Vec::new();
            while need > 0 {
                let Some(segment) = segments.get(seg) else {
                    return Err(Error::invalid_argument(format!(
                        "request buffer ends {} bytes short of input '{}'",
                        need, meta.name
                    )));
                };
                let avail = segment.len() - offset;
                if avail == 0 {
                    seg += 1;
                    offset = 0;
                    continue;
                }
                let take = avail.min(need);
                ranges.push(segment.slice(offset..offset + take));
                offset += take;
                need -= take;
            }
            blocks.push(ranges);
        }
        while seg < segments.len() && offset >= segments[seg].len() {
            seg += 1;
            offset = 0;
        }
        if seg < segments.len() {
            return Err(Error::invalid_argument(
                "request buffer holds more bytes than the declared inputs",
            ));
        }

        let n = blocks.len();
        Ok(Self {
            model_name: model_name.into(),
            model_version,
            header,
            blocks,
            cursor: vec![0; n],
            contiguous: vec![None; n],
        })
    }
}

impl RequestProvider for StreamingRequestProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn model_version(&self) -> i64 {
        self.model_version
    }

    fn request_header(&self) -> &api::InferRequestHeader {
        &self.header
    }

    fn next_input_content(
        &mut self,
        idx: usize,
        force_contiguous: bool,
    ) -> Result<Option<Bytes>> {
        if idx >= self.blocks.len() {
            return Err(Error::invalid_argument(format!(
                "input index {idx} out of range"
            )));
        }

        if !force_contiguous {
            let at = self.cursor[idx];
            if at >= self.blocks[idx].len() {
                return Ok(None);
            }
            self.cursor[idx] = at + 1;
            return Ok(Some(self.blocks[idx][at].clone()));
        }

        if let Some(cached) = &self.contiguous[idx] {
            return Ok(Some(cached.clone()));
        }
        let at = self.cursor[idx];
        let ranges = &self.blocks[idx];
        if at >= ranges.len() {
            return Ok(None);
        }
        let assembled = if ranges.len() - at == 1 {
            // Already contiguous; no copy.
            ranges[at].clone()
        } else {
            let total = ranges[at..].iter().map(Bytes::len).sum();
            let mut scratch = BytesMut::with_capacity(total);
            for range in &ranges[at..] {
                scratch.extend_from_slice(range);
            }
            scratch.freeze()
        };
        self.cursor[idx] = self.blocks[idx].len();
        self.contiguous[idx] = Some(assembled.clone());
        Ok(Some(assembled))
    }
}
