use crate::{DType, IOName, Shape};

/// Declared configuration for one model input or output.
///
/// Dims exclude the batch dimension; the descriptor is the authority
/// for validating declared byte sizes, so dims are concrete.
#[derive(Clone, Debug)]
pub struct TensorDescriptor {
    pub name: IOName,
    pub dtype: DType,
    pub dims: Shape,
}

impl TensorDescriptor {
    pub fn new(name: &str, dtype: DType, dims: &[usize]) -> Self {
        Self {
            name: IOName(name.to_string()),
            dtype,
            dims: Shape::from_slice(dims),
        }
    }

    /// Byte size for a batch of tensors with this configuration.
    pub fn batch_byte_size(&self, batch_size: u32) -> u64 {
        self.dtype.byte_size() as u64 * self.dims.numel() as u64 * batch_size as u64
    }
}

#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    pub name: String,
    pub inputs: Vec<TensorDescriptor>,
    pub outputs: Vec<TensorDescriptor>,
    pub max_batch: u32,
}

impl ModelDescriptor {
    pub fn input(&self, name: &str) -> Option<&TensorDescriptor> {
        self.inputs.iter().find(|t| t.name.0 == name)
    }

    pub fn output(&self, name: &str) -> Option<&TensorDescriptor> {
        self.outputs.iter().find(|t| t.name.0 == name)
    }
}
