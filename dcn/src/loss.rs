use crate::common::*;

/// Training objective: classification cross entropy plus the weighted hint
/// loss. The weighting is a harness decision, so it is a constructor
/// parameter rather than a constant.
#[derive(Debug)]
pub struct DcnLoss {
    cross_entropy: CrossEntropyLoss,
    hint_weight: f64,
}

impl DcnLoss {
    pub fn new(hint_weight: f64) -> Self {
        Self {
            cross_entropy: CrossEntropyLoss::new(Reduction::Mean),
            hint_weight,
        }
    }

    pub fn forward(&self, logits: &Tensor, labels: &Tensor, hint_loss: &Tensor) -> Tensor {
        self.cross_entropy.forward(logits, labels) + hint_loss * self.hint_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::abs_diff_eq;

    #[test]
    fn hint_weight_scales_the_hint_term() {
        let loss_fn = DcnLoss::new(0.5);

        let logits = Tensor::of_slice(&[10.0f32, -10.0, -10.0, 10.0]).view([2, 2]);
        let labels = Tensor::of_slice(&[0i64, 1]);

        let zero_hint = Tensor::zeros(&[], (Kind::Float, Device::Cpu));
        let some_hint = Tensor::of_slice(&[2.0f32]).view([]);

        let base = f64::from(loss_fn.forward(&logits, &labels, &zero_hint));
        let weighted = f64::from(loss_fn.forward(&logits, &labels, &some_hint));

        assert!(abs_diff_eq!(weighted - base, 1.0, epsilon = 1e-6));
    }
}
