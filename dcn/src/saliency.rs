use crate::common::*;

/// Entropy of a batch of probability vectors, summed over the batch.
pub fn entropy(probs: &Tensor) -> Tensor {
    -(probs * probs.clamp(1e-10, 1.0).log()).sum(Kind::Float)
}

/// Top-k most salient feature-map locations of every batch element.
#[derive(Debug)]
pub struct Selection {
    /// saliency scores of the selected cells, `[batch, k]`
    pub values: Tensor,
    /// flattened feature-map indices of the selected cells, `[batch, k]` int64
    pub indices: Tensor,
    /// full saliency map, `[batch, height, width]`
    pub scores: Tensor,
}

/// Scores every spatial location by the channel-wise L2 norm of `grads` and
/// selects the `k` highest-scoring cells per batch element.
///
/// The k selected slots are then permuted, with one permutation shared across
/// the whole batch, so that batch normalization over the per-patch fine
/// features sees no positional bias.
pub fn identify_saliency<R>(grads: &Tensor, k: i64, rng: &mut R) -> Result<Selection>
where
    R: Rng + ?Sized,
{
    let (_bsize, _channels, height, width) = grads.size4()?;
    ensure!(
        height * width >= k,
        "cannot select {} cells from a {}x{} feature map",
        k,
        height,
        width
    );

    // L2 norm across the channel dimension
    let scores = (grads.pow_tensor_scalar(2).sum_dim_intlist(Some([1i64].as_slice()), false, Kind::Float) + 1e-8).sqrt();

    let flat = scores.view([-1, height * width]);
    let (values, indices) = flat.topk(k, 1, true, /* sorted = */ false);

    let mut slots: Vec<i64> = (0..k).collect();
    slots.shuffle(rng);
    let perm = Tensor::of_slice(&slots).to_device(indices.device());

    Ok(Selection {
        values: values.index_select(1, &perm),
        indices: indices.index_select(1, &perm),
        scores,
    })
}
