//! Safetensors-backed checkpoint access.
//!
//! The file is mapped read-only once; tensor data is decoded to f32 on
//! demand. A mapped checkpoint is immutable, so one instance can back any
//! number of sequential runs.

use std::path::Path;

use memmap2::MmapOptions;
use safetensors::tensor::{Dtype, SafeTensorError};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct TensorF32 {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorF32 {
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

#[derive(Debug)]
pub struct Checkpoint {
    mmap: memmap2::Mmap,
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("safetensors error: {0}")]
    SafeTensors(#[from] SafeTensorError),
    #[error("unsupported dtype for {name}: {dtype:?} (checkpoints are stored as f32)")]
    UnsupportedDtype { name: String, dtype: Dtype },
}

impl Checkpoint {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: read-only file mapping for immutable tensor access.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        // Validate the header eagerly so a truncated file fails at open time.
        safetensors::SafeTensors::deserialize(&mmap)?;
        Ok(Self { mmap })
    }

    pub fn names(&self) -> Result<Vec<String>, CheckpointError> {
        let st = safetensors::SafeTensors::deserialize(&self.mmap)?;
        Ok(st.iter().map(|(name, _)| name.to_string()).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        safetensors::SafeTensors::deserialize(&self.mmap)
            .map(|st| st.tensor(name).is_ok())
            .unwrap_or(false)
    }

    pub fn tensor(&self, name: &str) -> Result<TensorF32, CheckpointError> {
        let st = safetensors::SafeTensors::deserialize(&self.mmap)?;
        let tv = st.tensor(name)?;
        let dtype = tv.dtype();
        let shape = tv.shape().to_vec();
        let raw = tv.data();

        if dtype != Dtype::F32 {
            return Err(CheckpointError::UnsupportedDtype {
                name: name.to_string(),
                dtype,
            });
        }

        let data = raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(TensorF32 { shape, data })
    }
}
