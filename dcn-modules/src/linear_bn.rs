use crate::{batch_norm::BatchNormInit, common::*};

/// Fully-connected layer with optional batch normalization and ReLU,
/// in weights -> normalization -> activation order.
#[derive(Debug, Clone)]
pub struct LinearBnInit {
    pub in_dim: usize,
    pub out_dim: usize,
    pub relu: bool,
    pub batch_norm: Option<BatchNormInit>,
}

impl LinearBnInit {
    pub fn new(in_dim: usize, out_dim: usize) -> Self {
        Self {
            in_dim,
            out_dim,
            relu: false,
            batch_norm: Some(Default::default()),
        }
    }

    pub fn build<'p, P>(self, path: P) -> LinearBn
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();

        let Self {
            in_dim,
            out_dim,
            relu,
            batch_norm,
        } = self;

        let linear = nn::linear(
            path / "linear",
            in_dim as i64,
            out_dim as i64,
            Default::default(),
        );
        let bn = batch_norm.map(|init| init.build_1d(path / "bn", out_dim as i64));

        LinearBn { linear, bn, relu }
    }
}

#[derive(Debug)]
pub struct LinearBn {
    linear: nn::Linear,
    bn: Option<nn::BatchNorm>,
    relu: bool,
}

impl nn::ModuleT for LinearBn {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let Self {
            ref linear,
            ref bn,
            relu,
        } = *self;

        let xs = xs.apply(linear);
        let xs = match bn {
            Some(bn) => bn.forward_t(&xs, train),
            None => xs,
        };

        if relu {
            xs.relu()
        } else {
            xs
        }
    }
}
