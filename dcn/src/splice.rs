use crate::common::*;

/// Result of splicing fine features into a coarse feature map.
#[derive(Debug)]
pub struct Spliced {
    /// coarse map with the selected cells overwritten, `[batch, c, h, w]`
    pub merged: Tensor,
    /// original coarse values at the overwritten cells, flattened
    pub replaced: Tensor,
    /// fine features flattened in the same order as `replaced`
    pub fine: Tensor,
}

/// Overwrites selected cells of `coarse` with fine feature vectors.
///
/// `fine` is `[n_slots * batch, channels]`, grouped by slot first, matching
/// the order the patch groups are stacked for the fine pass. `locations[k][b]`
/// is the `(row, col)` cell chosen for batch element `b` at slot `k`. Cells
/// are addressed through a batch-major NHWC flattening of the coarse map:
/// channel 0 of cell `(row, col)` of batch element `b` lives at
/// `b*h*w*c + c*w*row + c*col`, and the cell occupies the `c` following
/// positions. Should two slots name the same cell, the later write wins, in
/// unspecified order. Every other position of `merged` is bit-identical to
/// `coarse`.
pub fn replace_features(
    coarse: &Tensor,
    fine: &Tensor,
    locations: &[Vec<(i64, i64)>],
) -> Result<Spliced> {
    let (bsize, channels, height, width) = coarse.size4()?;
    let (n_fine, fine_c) = fine.size2()?;
    ensure!(
        fine_c == channels && n_fine == locations.len() as i64 * bsize,
        "expect {} fine feature vectors of {} channels, got {} of {}",
        locations.len() as i64 * bsize,
        channels,
        n_fine,
        fine_c
    );

    let mut flat_idxs = Vec::with_capacity((n_fine * channels) as usize);
    for cells in locations {
        ensure!(
            cells.len() as i64 == bsize,
            "expect one cell per batch element, got {} cells for batch size {}",
            cells.len(),
            bsize
        );

        for (b, &(row, col)) in cells.iter().enumerate() {
            ensure!(
                (0..height).contains(&row) && (0..width).contains(&col),
                "cell ({}, {}) lies outside the {}x{} feature map",
                row,
                col,
                height,
                width
            );

            let base =
                b as i64 * height * width * channels + channels * width * row + channels * col;
            flat_idxs.extend(base..base + channels);
        }
    }

    let idxs = Tensor::of_slice(&flat_idxs).to_device(coarse.device());
    let flat_coarse = coarse.permute(&[0, 2, 3, 1]).reshape(&[-1]);
    let flat_fine = fine.reshape(&[-1]);

    let replaced = flat_coarse.index_select(0, &idxs);
    let merged = flat_coarse
        .index_copy(0, &idxs, &flat_fine)
        .view([bsize, height, width, channels])
        .permute(&[0, 3, 1, 2]);

    Ok(Spliced {
        merged,
        replaced,
        fine: flat_fine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_overwrites_selected_cells_only() -> Result<()> {
        let (bsize, channels, height, width) = (2, 3, 4, 4);
        let coarse = Tensor::arange(bsize * channels * height * width, (Kind::Float, Device::Cpu))
            .view([bsize, channels, height, width]);

        // slot 0 picks (0, 0) and (3, 3); slot 1 picks (1, 2) and (2, 1)
        let locations = vec![vec![(0, 0), (3, 3)], vec![(1, 2), (2, 1)]];
        let fine = Tensor::rand(&[4, channels], (Kind::Float, Device::Cpu)) + 1000.0;

        let spliced = replace_features(&coarse, &fine, &locations)?;
        assert_eq!(spliced.merged.size(), coarse.size());

        for (k, cells) in locations.iter().enumerate() {
            for (b, &(row, col)) in cells.iter().enumerate() {
                let merged_cell = spliced.merged.i((b as i64, .., row, col));
                let fine_row = fine.i(((k * 2 + b) as i64, ..));
                assert!(bool::from(merged_cell.eq_tensor(&fine_row).all()));
            }
        }

        let selected: Vec<(usize, i64, i64)> = locations
            .iter()
            .flat_map(|cells| cells.iter().enumerate().map(|(b, &cell)| (b, cell.0, cell.1)))
            .collect();
        for b in 0..bsize {
            for row in 0..height {
                for col in 0..width {
                    if selected.contains(&(b as usize, row, col)) {
                        continue;
                    }
                    let merged_cell = spliced.merged.i((b, .., row, col));
                    let coarse_cell = coarse.i((b, .., row, col));
                    assert!(bool::from(merged_cell.eq_tensor(&coarse_cell).all()));
                }
            }
        }

        Ok(())
    }

    #[test]
    fn replaced_values_come_from_the_coarse_map() -> Result<()> {
        let (bsize, channels, height, width) = (1, 2, 3, 3);
        let coarse = Tensor::arange(bsize * channels * height * width, (Kind::Float, Device::Cpu))
            .view([bsize, channels, height, width]);
        let locations = vec![vec![(2, 1)]];
        let fine = Tensor::zeros(&[1, channels], (Kind::Float, Device::Cpu));

        let spliced = replace_features(&coarse, &fine, &locations)?;

        let expected = coarse.i((0, .., 2, 1));
        assert!(bool::from(spliced.replaced.eq_tensor(&expected).all()));

        Ok(())
    }

    #[test]
    fn rejects_out_of_range_cells() {
        let coarse = Tensor::zeros(&[1, 2, 3, 3], (Kind::Float, Device::Cpu));
        let fine = Tensor::zeros(&[1, 2], (Kind::Float, Device::Cpu));

        assert!(replace_features(&coarse, &fine, &[vec![(3, 0)]]).is_err());
    }

    #[test]
    fn rejects_mismatched_fine_features() {
        let coarse = Tensor::zeros(&[2, 2, 3, 3], (Kind::Float, Device::Cpu));
        let fine = Tensor::zeros(&[3, 2], (Kind::Float, Device::Cpu));

        assert!(replace_features(&coarse, &fine, &[vec![(0, 0), (1, 1)]]).is_err());
    }
}
