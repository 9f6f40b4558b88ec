//! Tensor backend selection and host ↔ tensor bridging.
//!
//! Batched pairwise algebra (norms, Gram products, exponentials) runs on a
//! burn tensor backend. Decompositions and the small anchor-side state live
//! on the host as `nalgebra` matrices in f64. Only the two helpers below
//! cross that boundary.

use burn::backend::NdArray;
use burn::prelude::*;
use log::trace;
use nalgebra::DMatrix;

use crate::error::{NcutError, Result};

/// Backend used for all tensor work in the crate.
pub type AutoBackend = NdArray<f32>;

pub type AutoDevice = <AutoBackend as Backend>::Device;

pub fn get_device() -> AutoDevice {
    AutoDevice::default()
}

/// Upload a host matrix [R, C] as a row-major tensor [R, C].
pub fn matrix_to_tensor(matrix: &DMatrix<f64>, device: &AutoDevice) -> Tensor<AutoBackend, 2> {
    let (rows, cols) = matrix.shape();
    trace!("Uploading {}×{} host matrix to tensor backend", rows, cols);

    let flat: Vec<f32> = matrix
        .row_iter()
        .flat_map(|row| row.iter().map(|&v| v as f32).collect::<Vec<_>>())
        .collect();

    Tensor::<AutoBackend, 2>::from_data(TensorData::new(flat, Shape::new([rows, cols])), device)
}

/// Download a tensor [R, C] into a host matrix in f64.
pub fn tensor_to_matrix(tensor: Tensor<AutoBackend, 2>) -> Result<DMatrix<f64>> {
    let [rows, cols] = tensor.dims();
    let flat: Vec<f32> = tensor
        .to_data()
        .to_vec()
        .map_err(|e| NcutError::Backend(format!("{e:?}")))?;

    if flat.len() != rows * cols {
        return Err(NcutError::ShapeMismatch {
            context: "tensor download",
            expected: rows * cols,
            got: flat.len(),
        });
    }

    Ok(DMatrix::from_row_iterator(
        rows,
        cols,
        flat.into_iter().map(f64::from),
    ))
}
