use crate::common::*;
use dcn_modules::ConvBn2D;

/// High-resolution feature extractor: five 3x3 valid convolutions with two
/// 2x2 max pools. With interior padding enabled it reduces a 14x14 patch to
/// a single 24-channel feature vector; the full-image baseline disables the
/// padding and keeps a spatial map.
#[derive(Debug, Clone)]
pub struct FineStackInit {
    pub in_c: usize,
    pub pad: bool,
    pub batch_norm: BatchNormInit,
}

impl Default for FineStackInit {
    fn default() -> Self {
        Self {
            in_c: 1,
            pad: true,
            batch_norm: Default::default(),
        }
    }
}

impl FineStackInit {
    pub fn build<'p, P>(self, path: P) -> FineStack
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            pad,
            batch_norm,
        } = self;

        let out_c = FineStack::OUT_C as usize;
        let conv = |in_c: usize, name: &str| {
            ConvBn2DInit {
                batch_norm: Some(batch_norm.clone()),
                ..ConvBn2DInit::new(in_c, out_c, 3)
            }
            .build(path / name)
        };

        FineStack {
            conv1: conv(in_c, "fine_conv1"),
            conv2: conv(out_c, "fine_conv2"),
            conv3: conv(out_c, "fine_conv3"),
            conv4: conv(out_c, "fine_conv4"),
            conv5: conv(out_c, "fine_conv5"),
            pad,
        }
    }
}

#[derive(Debug)]
pub struct FineStack {
    conv1: ConvBn2D,
    conv2: ConvBn2D,
    conv3: ConvBn2D,
    conv4: ConvBn2D,
    conv5: ConvBn2D,
    pad: bool,
}

impl FineStack {
    pub const OUT_C: i64 = 24;

    /// Spatial side length of the output for a square input.
    pub fn output_size(input_size: i64, pad: bool) -> i64 {
        let conv = |n: i64| n - 2;
        let pool = |n: i64| n / 2;
        let p = if pad { 2 } else { 0 };

        let xs = pool(conv(conv(input_size)) + p);
        let xs = pool(conv(conv(xs) + p) + p);
        conv(xs)
    }
}

impl nn::ModuleT for FineStack {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let pad = |xs: Tensor| {
            if self.pad {
                xs.constant_pad_nd(&[1, 1, 1, 1])
            } else {
                xs
            }
        };

        let xs = pad(xs.apply_t(&self.conv1, train).apply_t(&self.conv2, train))
            .max_pool2d(&[2, 2], &[2, 2], &[0, 0], &[1, 1], false);
        let xs = pad(pad(xs.apply_t(&self.conv3, train)).apply_t(&self.conv4, train))
            .max_pool2d(&[2, 2], &[2, 2], &[0, 0], &[1, 1], false);
        xs.apply_t(&self.conv5, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fine_stack_reduces_patch_to_single_cell() {
        let vs = nn::VarStore::new(Device::Cpu);
        let stack = FineStackInit::default().build(&vs.root() / "fine_layers");

        let patches = Tensor::rand(&[48, 1, 14, 14], (Kind::Float, Device::Cpu));
        let output = stack.forward_t(&patches, true);

        assert_eq!(output.size(), &[48, 24, 1, 1]);
        assert_eq!(FineStack::output_size(14, true), 1);
    }

    #[test]
    fn unpadded_fine_stack_keeps_a_spatial_map() {
        let vs = nn::VarStore::new(Device::Cpu);
        let stack = FineStackInit {
            pad: false,
            ..Default::default()
        }
        .build(&vs.root() / "fine_layers");

        let images = Tensor::rand(&[2, 1, 48, 48], (Kind::Float, Device::Cpu));
        let output = stack.forward_t(&images, true);

        assert_eq!(output.size(), &[2, 24, 7, 7]);
        assert_eq!(FineStack::output_size(48, false), 7);
    }
}
