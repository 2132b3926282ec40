use crate::{
    common::*,
    model::{FineStack, FineStackInit, TopLayers, TopLayersInit},
};

/// Baseline that runs the fine stack over the full image and classifies with
/// the same head as the coarse-to-fine pipeline. The stack runs without
/// interior padding here (a 48x48 image leaves a 7x7 feature map; the head
/// pools over whatever spatial extent it receives). Returns a zero hint loss
/// so the training harness can treat both models uniformly.
#[derive(Debug, Clone)]
pub struct FineOnlyInit {
    pub in_c: usize,
    pub n_classes: usize,
    pub batch_norm: BatchNormInit,
}

impl Default for FineOnlyInit {
    fn default() -> Self {
        Self {
            in_c: 1,
            n_classes: 10,
            batch_norm: Default::default(),
        }
    }
}

impl FineOnlyInit {
    pub fn build<'p, P>(self, path: P) -> FineOnly
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            n_classes,
            batch_norm,
        } = self;

        let fine = FineStackInit {
            in_c,
            pad: false,
            batch_norm: batch_norm.clone(),
        }
        .build(path / "fine_layers");
        let top = TopLayersInit {
            in_c: FineStack::OUT_C as usize,
            n_classes,
            batch_norm,
        }
        .build(path / "top_layers");

        FineOnly { fine, top }
    }
}

#[derive(Debug)]
pub struct FineOnly {
    fine: FineStack,
    top: TopLayers,
}

impl FineOnly {
    pub fn forward_t(&self, input: &Tensor, train: bool) -> (Tensor, Tensor) {
        let features = self.fine.forward_t(input, train);
        let logits = self.top.forward_t(&features, train);
        let hint_loss =
            Tensor::zeros(&[], (Kind::Float, input.device())).set_requires_grad(false);
        (logits, hint_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fine_only_output_shape() {
        let vs = nn::VarStore::new(Device::Cpu);
        let model = FineOnlyInit::default().build(&vs.root() / "fine_only");

        let input = Tensor::rand(&[2, 1, 48, 48], (Kind::Float, Device::Cpu));
        let (logits, hint_loss) = model.forward_t(&input, true);

        assert_eq!(logits.size(), &[2, 10]);
        assert_eq!(f64::from(&hint_loss), 0.0);
    }
}
