//! Execution engine for the neighbour searches of the reducer and clusterer

use crate::error::Result;
use crate::topics::similarity::squared_euclidean;
use candle_core::{DType, Device, Tensor};
use log::info;
use std::ops::Range;

const KNN_BLOCK_ROWS: usize = 1024;

/// Where pairwise distances are computed. Both variants return the same
/// neighbour lists for the same input.
#[derive(Debug, Clone, Default)]
pub enum ComputeBackend {
    #[default]
    Cpu,
    Accelerated(Device),
}

/// Get the best available device (GPU if compiled in and present, CPU fallback)
pub fn get_best_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            info!("Using CUDA GPU for neighbour search");
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal GPU for neighbour search");
                return device;
            }
            Err(e) => log::warn!("Metal GPU initialization failed: {}", e),
        }
    }

    info!("No GPU available, using candle's CPU engine");
    Device::Cpu
}

impl ComputeBackend {
    pub fn select(accelerated: bool) -> Self {
        if accelerated {
            ComputeBackend::Accelerated(get_best_device())
        } else {
            ComputeBackend::Cpu
        }
    }

    pub fn name(&self) -> String {
        match self {
            ComputeBackend::Cpu => "cpu".to_string(),
            ComputeBackend::Accelerated(device) => format!("accelerated ({:?})", device),
        }
    }

    /// Squared euclidean distances from rows `rows` of `data` to every row
    pub fn sq_distances(&self, data: &[Vec<f32>], rows: Range<usize>) -> Result<Vec<Vec<f32>>> {
        match self {
            ComputeBackend::Cpu => Ok(data[rows]
                .iter()
                .map(|a| data.iter().map(|b| squared_euclidean(a, b)).collect())
                .collect()),
            ComputeBackend::Accelerated(device) => tensor_sq_distances(data, rows, device),
        }
    }

    /// The `k` nearest neighbours of every row (self excluded), nearest first,
    /// as `(index, euclidean distance)` pairs
    pub fn knn(&self, data: &[Vec<f32>], k: usize) -> Result<Vec<Vec<(usize, f32)>>> {
        let mut result = Vec::with_capacity(data.len());
        let mut start = 0;
        while start < data.len() {
            let end = (start + KNN_BLOCK_ROWS).min(data.len());
            for (offset, row) in self.sq_distances(data, start..end)?.into_iter().enumerate() {
                let i = start + offset;
                let mut neighbours: Vec<(usize, f32)> = row
                    .into_iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(j, d)| (j, d.max(0.0).sqrt()))
                    .collect();
                neighbours.sort_by(|a, b| {
                    a.1.partial_cmp(&b.1)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.0.cmp(&b.0))
                });
                neighbours.truncate(k);
                result.push(neighbours);
            }
            start = end;
        }
        Ok(result)
    }
}

/// ||a||² + ||b||² - 2 a·b evaluated with tensors
fn tensor_sq_distances(data: &[Vec<f32>], rows: Range<usize>, device: &Device) -> Result<Vec<Vec<f32>>> {
    let n = data.len();
    if n == 0 || rows.is_empty() {
        return Ok(Vec::new());
    }
    let dim = data[0].len();
    let flat: Vec<f32> = data.iter().flat_map(|row| row.iter().copied()).collect();

    let all = Tensor::from_vec(flat, (n, dim), device)?.to_dtype(DType::F32)?;
    let block = all.narrow(0, rows.start, rows.len())?;
    let all_norms = all.sqr()?.sum_keepdim(1)?.t()?;
    let block_norms = block.sqr()?.sum_keepdim(1)?;
    let gram = block.matmul(&all.t()?.contiguous()?)?;
    let distances = block_norms
        .broadcast_add(&all_norms)?
        .broadcast_sub(&gram.affine(2.0, 0.0)?)?
        .relu()?;

    let mut result = distances.to_vec2::<f32>()?;
    for (offset, row) in result.iter_mut().enumerate() {
        row[rows.start + offset] = 0.0;
    }
    Ok(result)
}
