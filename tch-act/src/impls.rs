use crate::Activation;
use tch::{nn, Tensor};

const LRELU_NEGATIVE_SLOPE: f64 = 0.2;

impl nn::Module for Activation {
    fn forward(&self, xs: &Tensor) -> Tensor {
        use Activation::*;

        match *self {
            Linear => xs.shallow_clone(),
            Relu => xs.relu(),
            LRelu => lrelu(xs),
            Logistic => xs.sigmoid(),
            Tanh => xs.tanh(),
        }
    }
}

pub fn lrelu(tensor: &Tensor) -> Tensor {
    leaky_relu_ext(tensor, Some(LRELU_NEGATIVE_SLOPE))
}

pub fn leaky_relu_ext(tensor: &Tensor, negative_slope: Option<f64>) -> Tensor {
    tensor.maximum(&(tensor * negative_slope.unwrap_or(0.01)))
}
