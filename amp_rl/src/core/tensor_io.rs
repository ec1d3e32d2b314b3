//! Conversions between flat row-major buffers and burn tensors.

use burn::prelude::*;
use burn::tensor::{Bool, TensorData};

/// Read a float tensor into a flat `f32` buffer plus its shape.
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> (Vec<f32>, [usize; D]) {
    let dims = tensor.dims();
    let values = tensor.into_data().iter::<f32>().collect();
    (values, dims)
}

/// Build a float tensor from a flat buffer.
pub fn tensor_from_vec<B: Backend, const D: usize>(
    values: Vec<f32>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D> {
    Tensor::from_data(TensorData::new(values, shape), device)
}

/// Read a boolean tensor into a flat buffer plus its shape.
pub fn mask_to_vec<B: Backend, const D: usize>(mask: Tensor<B, D, Bool>) -> (Vec<bool>, [usize; D]) {
    let dims = mask.dims();
    let values = mask.into_data().iter::<bool>().collect();
    (values, dims)
}

/// Build a boolean tensor from a flat buffer.
pub fn mask_from_vec<B: Backend, const D: usize>(
    values: Vec<bool>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D, Bool> {
    Tensor::from_data(TensorData::new(values, shape), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_float_round_trip() {
        let device = Default::default();
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let tensor = tensor_from_vec::<B, 2>(values.clone(), [2, 3], &device);
        let (back, dims) = tensor_to_vec(tensor);
        assert_eq!(dims, [2, 3]);
        assert_eq!(back, values);
    }

    #[test]
    fn test_mask_round_trip() {
        let device = Default::default();
        let values = vec![true, false, false, true];
        let mask = mask_from_vec::<B, 2>(values.clone(), [2, 2], &device);
        let (back, dims) = mask_to_vec(mask);
        assert_eq!(dims, [2, 2]);
        assert_eq!(back, values);
    }
}
