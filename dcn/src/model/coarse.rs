use crate::common::*;
use dcn_modules::ConvBn2D;

/// Two stride-2 valid convolutions producing the downsampled coarse feature
/// map the saliency selection and splicing operate on.
#[derive(Debug, Clone)]
pub struct CoarseStackInit {
    pub in_c: usize,
    pub batch_norm: BatchNormInit,
}

impl Default for CoarseStackInit {
    fn default() -> Self {
        Self {
            in_c: 1,
            batch_norm: Default::default(),
        }
    }
}

impl CoarseStackInit {
    pub fn build<'p, P>(self, path: P) -> CoarseStack
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self { in_c, batch_norm } = self;

        let conv1 = ConvBn2DInit {
            s: 2,
            batch_norm: Some(batch_norm.clone()),
            ..ConvBn2DInit::new(in_c, 12, 7)
        }
        .build(path / "coarse_conv1");
        let conv2 = ConvBn2DInit {
            s: 2,
            batch_norm: Some(batch_norm),
            ..ConvBn2DInit::new(12, CoarseStack::OUT_C as usize, 3)
        }
        .build(path / "coarse_conv2");

        CoarseStack { conv1, conv2 }
    }
}

#[derive(Debug)]
pub struct CoarseStack {
    conv1: ConvBn2D,
    conv2: ConvBn2D,
}

impl CoarseStack {
    pub const OUT_C: i64 = 24;

    /// Feature-map side length for a square input of `image_size` pixels.
    pub fn feature_map_size(image_size: i64) -> i64 {
        let after_conv1 = (image_size - 7) / 2 + 1;
        (after_conv1 - 3) / 2 + 1
    }
}

impl nn::ModuleT for CoarseStack {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        xs.apply_t(&self.conv1, train).apply_t(&self.conv2, train)
    }
}
