use crate::common::*;

/// Squared distance between the coarse feature vectors that were replaced and
/// the fine feature vectors that replaced them.
///
/// Inputs are `[n_groups, channels]` tensors, one row per spliced cell. With
/// `Reduction::Mean` the result is the total squared difference divided by the
/// number of groups, i.e. `batch_size * n_patches` for a full forward pass.
#[derive(Debug)]
pub struct HintLoss {
    reduction: Reduction,
}

impl HintLoss {
    pub fn new(reduction: Reduction) -> Self {
        Self { reduction }
    }

    pub fn forward(&self, input: &Tensor, target: &Tensor) -> Tensor {
        // return zero tensor if (1) input is empty and (2) using mean reduction
        if input.numel() == 0 && self.reduction == Reduction::Mean {
            return Tensor::zeros(&[], (Kind::Float, input.device())).set_requires_grad(false);
        }

        let loss = (input - target)
            .pow_tensor_scalar(2)
            .sum_dim_intlist(Some([-1i64].as_slice()), false, Kind::Float);

        match self.reduction {
            Reduction::None => loss,
            Reduction::Sum => loss.sum(Kind::Float),
            Reduction::Mean => loss.mean(Kind::Float),
            Reduction::Other(_) => unimplemented!(),
        }
    }
}
