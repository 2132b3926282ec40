use crate::common::*;

/// Zero padding applied to each spatial side of the input before cropping.
pub const INPUT_PADDING: i64 = 2;

/// Candidate jitter margins, sorted ascending; two of the four slots are
/// drawn without replacement per crop.
pub const EXTRA_MARGINS: [i64; 4] = [1, 1, 2, 2];

/// Crops one fixed-size window per batch element from the zero-padded input.
///
/// Every crop origin is jittered independently by a freshly drawn margin
/// pair before slicing. A window reaching outside the padded image is an
/// error; the forward pass fails rather than clamping.
pub fn extract_patches<R>(
    images: &Tensor,
    origins: &[(i64, i64)],
    size: (i64, i64),
    rng: &mut R,
) -> Result<Tensor>
where
    R: Rng + ?Sized,
{
    let (bsize, _channels, _height, _width) = images.size4()?;
    ensure!(
        origins.len() as i64 == bsize,
        "expect one crop origin per batch element, got {} origins for batch size {}",
        origins.len(),
        bsize
    );

    let padded = images.constant_pad_nd(&[INPUT_PADDING; 4]);
    let (_, _, padded_h, padded_w) = padded.size4()?;
    let (size_h, size_w) = size;

    let patches: Vec<_> = origins
        .iter()
        .enumerate()
        .map(|(b, &(origin_row, origin_col))| {
            let mut margins = EXTRA_MARGINS;
            margins.shuffle(rng);
            let top = origin_row - margins[0];
            let left = origin_col - margins[1];
            ensure!(
                top >= 0 && left >= 0 && top + size_h <= padded_h && left + size_w <= padded_w,
                "{}x{} crop at ({}, {}) exceeds the padded {}x{} image",
                size_h,
                size_w,
                top,
                left,
                padded_h,
                padded_w
            );

            Ok(padded
                .narrow(0, b as i64, 1)
                .narrow(2, top, size_h)
                .narrow(3, left, size_w))
        })
        .try_collect()?;

    Ok(Tensor::cat(&patches, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn patch_shape_invariant() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let images = Tensor::rand(&[3, 1, 48, 48], (Kind::Float, Device::Cpu));
        let origins = [(2, 2), (20, 31), (38, 38)];

        let patches = extract_patches(&images, &origins, (14, 14), &mut rng)?;
        assert_eq!(patches.size(), &[3, 1, 14, 14]);

        Ok(())
    }

    #[test]
    fn margins_are_deterministic_under_fixed_seed() -> Result<()> {
        let images = Tensor::rand(&[2, 1, 48, 48], (Kind::Float, Device::Cpu));
        let origins = [(10, 10), (25, 17)];

        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        let patches1 = extract_patches(&images, &origins, (14, 14), &mut rng1)?;
        let patches2 = extract_patches(&images, &origins, (14, 14), &mut rng2)?;

        let diff = f64::from((patches1 - patches2).abs().sum(Kind::Float));
        assert_eq!(diff, 0.0);

        Ok(())
    }

    #[test]
    fn out_of_bounds_window_fails() {
        let mut rng = StdRng::seed_from_u64(0);
        let images = Tensor::rand(&[1, 1, 48, 48], (Kind::Float, Device::Cpu));

        // origin 45 starts the window at 43 or 44; either way it overruns the
        // 52-pixel padded image
        assert!(extract_patches(&images, &[(45, 45)], (14, 14), &mut rng).is_err());
    }
}
