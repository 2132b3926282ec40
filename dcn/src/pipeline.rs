use crate::{
    common::*,
    geometry,
    model::{CoarseStack, CoarseStackInit, FineStack, FineStackInit, TopLayers, TopLayersInit},
    patch::{self, EXTRA_MARGINS, INPUT_PADDING},
    saliency, splice,
};

/// Number of salient locations refined per image.
pub const N_PATCHES: i64 = 24;
/// Side length of an extracted high-resolution patch.
pub const PATCH_SIZE: i64 = 14;

#[derive(Debug, Clone)]
pub struct DcnInit {
    pub in_c: usize,
    pub image_size: i64,
    pub n_classes: usize,
    pub n_patches: i64,
    pub patch_size: i64,
    pub batch_norm: BatchNormInit,
}

impl Default for DcnInit {
    fn default() -> Self {
        Self {
            in_c: 1,
            image_size: 48,
            n_classes: 10,
            n_patches: N_PATCHES,
            patch_size: PATCH_SIZE,
            batch_norm: Default::default(),
        }
    }
}

impl DcnInit {
    pub fn build<'p, P>(self, path: P) -> Result<Dcn>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let path = path.borrow();
        let Self {
            in_c,
            image_size,
            n_classes,
            n_patches,
            patch_size,
            batch_norm,
        } = self;

        let map_size = CoarseStack::feature_map_size(image_size);
        ensure!(
            map_size > 0,
            "image size {} is too small for the coarse stack",
            image_size
        );
        ensure!(
            map_size * map_size >= n_patches,
            "cannot select {} patches from a {}x{} coarse feature map",
            n_patches,
            map_size,
            map_size
        );
        ensure!(
            FineStack::output_size(patch_size, true) == 1,
            "fine stack does not reduce a {}x{} patch to a single cell",
            patch_size,
            patch_size
        );

        // every candidate crop window must fit in the padded input; margins
        // are sorted ascending
        let padded = image_size + 2 * INPUT_PADDING;
        let first = geometry::pixel_origin(0) - EXTRA_MARGINS[3];
        let last = geometry::pixel_origin(map_size - 1) - EXTRA_MARGINS[0] + patch_size;
        ensure!(
            first >= 0 && last <= padded,
            "crop windows span {}..{} and exceed the padded {}x{} image",
            first,
            last,
            padded,
            padded
        );

        info!(
            "building model: {}x{} coarse feature map, {} refined {}x{} patches per image",
            map_size, map_size, n_patches, patch_size, patch_size
        );

        let coarse = CoarseStackInit {
            in_c,
            batch_norm: batch_norm.clone(),
        }
        .build(path / "coarse_layers");
        let fine = FineStackInit {
            in_c,
            batch_norm: batch_norm.clone(),
            ..Default::default()
        }
        .build(path / "fine_layers");
        let top = TopLayersInit {
            in_c: CoarseStack::OUT_C as usize,
            n_classes,
            batch_norm,
        }
        .build(path / "top_layers");

        Ok(Dcn {
            coarse,
            fine,
            top,
            hint_loss: HintLoss::new(Reduction::Mean),
            n_patches,
            patch_size,
            map_size,
        })
    }
}

/// The coarse-to-fine pipeline: coarse pass, saliency selection, patch
/// extraction, fine pass, feature splice, final pass.
#[derive(Debug)]
pub struct Dcn {
    coarse: CoarseStack,
    fine: FineStack,
    top: TopLayers,
    hint_loss: HintLoss,
    n_patches: i64,
    patch_size: i64,
    map_size: i64,
}

#[derive(Debug)]
pub struct DcnOutput {
    pub final_logits: Tensor,
    pub coarse_logits: Tensor,
    pub hint_loss: Tensor,
    /// saliency map, `[batch, height, width]`
    pub saliency: Tensor,
    /// flattened feature-map indices of the refined cells, `[batch, k]`
    pub selected: Tensor,
    pub coarse_features: Tensor,
    pub merged_features: Tensor,
}

impl Dcn {
    /// Runs one forward pass. Must run with gradient tracking enabled; the
    /// saliency map is the gradient of the coarse prediction entropy.
    pub fn forward_t<R>(&self, input: &Tensor, train: bool, rng: &mut R) -> Result<DcnOutput>
    where
        R: Rng + ?Sized,
    {
        let (bsize, _in_c, _height, _width) = input.size4()?;
        let k = self.n_patches;

        let coarse_features = self.coarse.forward_t(input, train);
        let coarse_logits = self.top.forward_t(&coarse_features, train);

        let probs = coarse_logits.softmax(-1, Kind::Float);
        let objective = saliency::entropy(&probs);
        let grad = Tensor::run_backward(&[&objective], &[&coarse_features], true, false)
            .into_iter()
            .next()
            .ok_or_else(|| format_err!("missing entropy gradient"))?;

        let selection = saliency::identify_saliency(&grad, k, rng)?;

        // selection indices are fully materialized on the host before the
        // feature gather and scatter below run
        let flat_idxs = Vec::<i64>::from(&selection.indices.contiguous().view([-1]));

        let mut cells = Vec::with_capacity(k as usize);
        let mut patch_groups = Vec::with_capacity(k as usize);
        for slot in 0..k {
            let slot_idxs = (0..bsize).map(|b| flat_idxs[(b * k + slot) as usize]);
            let slot_cells: Vec<_> = slot_idxs
                .clone()
                .map(|idx| geometry::map_to_cell(idx, self.map_size))
                .collect();
            let origins: Vec<_> = slot_idxs
                .map(|idx| geometry::map_to_origin(idx, self.map_size))
                .collect();

            let patches = patch::extract_patches(
                input,
                &origins,
                (self.patch_size, self.patch_size),
                rng,
            )?;
            cells.push(slot_cells);
            patch_groups.push(patches);
        }

        // all batch * k crops go through the fine stack at once
        let stacked = Tensor::cat(&patch_groups, 0);
        let fine_features = self
            .fine
            .forward_t(&stacked, train)
            .view([-1, FineStack::OUT_C]);

        let spliced = splice::replace_features(&coarse_features, &fine_features, &cells)?;
        let hint_loss = self.hint_loss.forward(
            &spliced.replaced.view([-1, CoarseStack::OUT_C]),
            &spliced.fine.view([-1, CoarseStack::OUT_C]),
        );

        // the final classifier shares its parameters with the coarse pass
        let final_logits = self.top.forward_t(&spliced.merged, train);

        Ok(DcnOutput {
            final_logits,
            coarse_logits,
            hint_loss,
            saliency: selection.scores,
            selected: selection.indices,
            coarse_features,
            merged_features: spliced.merged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::abs_diff_eq;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn end_to_end_forward() -> Result<()> {
        let device = Device::Cpu;
        let vs = nn::VarStore::new(device);
        let model = DcnInit::default().build(&vs.root() / "dcn")?;

        let input = Tensor::rand(&[2, 1, 48, 48], (Kind::Float, device));
        let mut rng = StdRng::seed_from_u64(42);
        let output = model.forward_t(&input, true, &mut rng)?;

        assert_eq!(output.final_logits.size(), &[2, 10]);
        assert_eq!(output.coarse_logits.size(), &[2, 10]);
        assert_eq!(output.coarse_features.size(), &[2, 24, 10, 10]);
        assert_eq!(output.merged_features.size(), &[2, 24, 10, 10]);
        assert_eq!(output.saliency.size(), &[2, 10, 10]);
        assert_eq!(output.selected.size(), &[2, 24]);

        // exactly 24 distinct locations per image
        for b in 0..2 {
            let idxs = Vec::<i64>::from(&output.selected.i((b, ..)));
            let distinct: HashSet<_> = idxs.iter().copied().collect();
            assert_eq!(distinct.len(), 24);
        }

        let hint = f64::from(&output.hint_loss);
        assert!(hint >= 0.0);

        // merged features differ from the coarse map only at selected cells
        let diff = (&output.merged_features - &output.coarse_features)
            .abs()
            .sum_dim_intlist(Some([1i64].as_slice()), false, Kind::Float);
        for b in 0..2 {
            let selected: HashSet<(i64, i64)> = Vec::<i64>::from(&output.selected.i((b, ..)))
                .into_iter()
                .map(|idx| geometry::map_to_cell(idx, 10))
                .collect();
            for row in 0..10 {
                for col in 0..10 {
                    if f64::from(diff.i((b, row, col))) != 0.0 {
                        assert!(selected.contains(&(row, col)));
                    }
                }
            }
        }

        // hint loss equals the recomputed normalized squared difference over
        // batch_size * n_patches = 48 spliced cells
        let manual = f64::from(
            (&output.merged_features - &output.coarse_features)
                .pow_tensor_scalar(2)
                .sum(Kind::Float),
        ) / 48.0;
        assert!(abs_diff_eq!(hint, manual, epsilon = 1e-3 * manual.max(1.0)));

        Ok(())
    }

    #[test]
    fn forward_is_deterministic_under_fixed_seed() -> Result<()> {
        let device = Device::Cpu;
        let vs = nn::VarStore::new(device);
        let model = DcnInit::default().build(&vs.root() / "dcn")?;

        let input = Tensor::rand(&[2, 1, 48, 48], (Kind::Float, device));

        let mut rng1 = StdRng::seed_from_u64(7);
        let mut rng2 = StdRng::seed_from_u64(7);
        let output1 = model.forward_t(&input, true, &mut rng1)?;
        let output2 = model.forward_t(&input, true, &mut rng2)?;

        assert!(bool::from(
            output1.selected.eq_tensor(&output2.selected).all()
        ));
        assert_eq!(
            f64::from(&output1.hint_loss),
            f64::from(&output2.hint_loss)
        );

        let logit_diff = f64::from(
            (&output1.final_logits - &output2.final_logits)
                .abs()
                .sum(Kind::Float),
        );
        assert_eq!(logit_diff, 0.0);

        Ok(())
    }

    #[test]
    fn build_rejects_oversized_selection() {
        // a 48x48 input yields a 10x10 coarse map, so 128 patches cannot fit
        let vs = nn::VarStore::new(Device::Cpu);
        let init = DcnInit {
            n_patches: 128,
            ..Default::default()
        };

        assert!(init.build(&vs.root() / "dcn").is_err());
    }

    #[test]
    fn build_rejects_unsupported_patch_size() {
        let vs = nn::VarStore::new(Device::Cpu);
        let init = DcnInit {
            patch_size: 9,
            ..Default::default()
        };

        assert!(init.build(&vs.root() / "dcn").is_err());
    }
}
