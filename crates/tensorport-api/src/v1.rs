use bytes::Bytes;

/// Meta-data for one requested input tensor.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestInput {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// Per-item dims (batch dimension excluded).
    #[prost(int64, repeated, tag = "2")]
    pub dims: ::prost::alloc::vec::Vec<i64>,
    /// Total bytes supplied for this input across the whole batch.
    #[prost(uint64, tag = "3")]
    pub batch_byte_size: u64,
}

/// Classification production parameters for a requested output.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClassParam {
    /// Number of top-valued classes to report per batch item.
    #[prost(uint32, tag = "1")]
    pub count: u32,
}

/// Meta-data for one requested output tensor.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestOutput {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// When set, the output is returned as labeled classes instead of
    /// raw tensor bytes.
    #[prost(message, optional, tag = "2")]
    pub cls: ::core::option::Option<ClassParam>,
}

/// Immutable description of what a request reads and produces.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InferRequestHeader {
    #[prost(uint32, tag = "1")]
    pub batch_size: u32,
    #[prost(message, repeated, tag = "2")]
    pub input: ::prost::alloc::vec::Vec<RequestInput>,
    #[prost(message, repeated, tag = "3")]
    pub output: ::prost::alloc::vec::Vec<RequestOutput>,
}

/// Raw result meta-data for one produced output.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OutputRaw {
    #[prost(int64, repeated, tag = "1")]
    pub dims: ::prost::alloc::vec::Vec<i64>,
    #[prost(uint64, tag = "2")]
    pub batch_byte_size: u64,
}

/// One classification result.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClassEntry {
    #[prost(uint32, tag = "1")]
    pub idx: u32,
    #[prost(float, tag = "2")]
    pub value: f32,
    #[prost(string, tag = "3")]
    pub label: ::prost::alloc::string::String,
}

/// Classifications for one batch item.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClassList {
    #[prost(message, repeated, tag = "1")]
    pub cls: ::prost::alloc::vec::Vec<ClassEntry>,
}

/// One produced output: raw meta-data or per-batch-item classes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseOutput {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub raw: ::core::option::Option<OutputRaw>,
    #[prost(message, repeated, tag = "3")]
    pub batch_classes: ::prost::alloc::vec::Vec<ClassList>,
}

/// Response meta-data, built while outputs are finalized.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InferResponseHeader {
    #[prost(string, tag = "1")]
    pub model_name: ::prost::alloc::string::String,
    #[prost(int64, tag = "2")]
    pub model_version: i64,
    #[prost(uint32, tag = "3")]
    pub batch_size: u32,
    #[prost(message, repeated, tag = "4")]
    pub output: ::prost::alloc::vec::Vec<ResponseOutput>,
}

/// An embedded-message inference request: header plus one raw-input
/// blob per declared input, in header order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InferRequest {
    #[prost(string, tag = "1")]
    pub model_name: ::prost::alloc::string::String,
    /// Requested model version, or -1 for "any".
    #[prost(int64, tag = "2")]
    pub model_version: i64,
    #[prost(message, optional, tag = "3")]
    pub meta_data: ::core::option::Option<InferRequestHeader>,
    #[prost(bytes = "bytes", repeated, tag = "4")]
    pub raw_input: ::prost::alloc::vec::Vec<Bytes>,
}

/// An embedded-message inference response: header plus one raw-output
/// blob per raw (non-classification) output, in header order.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InferResponse {
    #[prost(message, optional, tag = "1")]
    pub meta_data: ::core::option::Option<InferResponseHeader>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub raw_output: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}
