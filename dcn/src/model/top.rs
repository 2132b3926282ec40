use crate::common::*;
use dcn_modules::{ConvBn2D, LinearBn};

/// Shared classifier head: one stride-2 valid convolution, a global max pool
/// over whatever spatial extent remains, and a batch-normalized linear layer
/// producing the class logits.
///
/// The same value serves both the coarse pass and the final pass over the
/// spliced feature map; sharing the handle shares the parameters.
#[derive(Debug, Clone)]
pub struct TopLayersInit {
    pub in_c: usize,
    pub n_classes: usize,
    pub batch_norm: BatchNormInit,
}

impl Default for TopLayersInit {
    fn default() -> Self {
        Self {
            in_c: 24,
            n_classes: 10,
            batch_norm: Default::default(),
        }
    }
}

impl TopLayersInit {
    pub fn build<'p, P>(self, path: P) -> TopLayers
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            n_classes,
            batch_norm,
        } = self;

        let out_c = 96;
        let conv = ConvBn2DInit {
            s: 2,
            batch_norm: Some(batch_norm.clone()),
            ..ConvBn2DInit::new(in_c, out_c, 4)
        }
        .build(path / "top_conv1");
        let logits = LinearBnInit {
            batch_norm: Some(batch_norm),
            ..LinearBnInit::new(out_c, n_classes)
        }
        .build(path / "top_logits");

        TopLayers {
            conv,
            logits,
            out_c: out_c as i64,
        }
    }
}

#[derive(Debug)]
pub struct TopLayers {
    conv: ConvBn2D,
    logits: LinearBn,
    out_c: i64,
}

impl nn::ModuleT for TopLayers {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let xs = xs.apply_t(&self.conv, train);
        let (_, _, fm_h, fm_w) = xs.size4().unwrap();
        let xs = xs
            .max_pool2d(&[fm_h, fm_w], &[1, 1], &[0, 0], &[1, 1], false)
            .view([-1, self.out_c]);
        self.logits.forward_t(&xs, train)
    }
}
