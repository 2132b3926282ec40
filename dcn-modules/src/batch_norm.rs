use crate::common::*;

/// Batch normalization hyper-parameters shared by every stack in the model.
///
/// `decay` follows the exponential-moving-average convention, so the momentum
/// handed to the underlying batch norm is `1 - decay`.
#[derive(Debug, Clone)]
pub struct BatchNormInit {
    pub decay: R64,
    pub eps: R64,
}

impl Default for BatchNormInit {
    fn default() -> Self {
        Self {
            decay: r64(0.99),
            eps: r64(0.001),
        }
    }
}

impl BatchNormInit {
    fn config(&self) -> nn::BatchNormConfig {
        nn::BatchNormConfig {
            momentum: 1.0 - self.decay.raw(),
            eps: self.eps.raw(),
            ws_init: nn::Init::Const(1.0),
            bs_init: nn::Init::Const(0.0),
            ..Default::default()
        }
    }

    pub fn build_2d<'a>(self, path: impl Borrow<nn::Path<'a>>, out_dim: i64) -> nn::BatchNorm {
        nn::batch_norm2d(path.borrow(), out_dim, self.config())
    }

    pub fn build_1d<'a>(self, path: impl Borrow<nn::Path<'a>>, out_dim: i64) -> nn::BatchNorm {
        nn::batch_norm1d(path.borrow(), out_dim, self.config())
    }
}
