//! MNIST training loop for the coarse-to-fine classifier.

use crate::{
    common::*,
    config::{Config, ModelConfig},
};
use dcn::{
    model::{FineOnly, FineOnlyInit},
    Dcn, DcnInit, DcnLoss,
};

enum Model {
    Dcn(Dcn),
    FineOnly(FineOnly),
}

impl Model {
    fn forward_t<R>(&self, input: &Tensor, train: bool, rng: &mut R) -> Result<(Tensor, Tensor)>
    where
        R: Rng + ?Sized,
    {
        match self {
            Self::Dcn(model) => {
                let output = model.forward_t(input, train, rng)?;
                Ok((output.final_logits, output.hint_loss))
            }
            Self::FineOnly(model) => Ok(model.forward_t(input, train)),
        }
    }
}

pub fn start(config: Config) -> Result<()> {
    let Config {
        model: model_config,
        dataset,
        training,
    } = config;

    let device = Device::cuda_if_available();
    tch::manual_seed(training.seed as i64);
    let mut rng = StdRng::seed_from_u64(training.seed);

    let mnist = tch::vision::mnist::load_dir(&dataset.dir)
        .with_context(|| format!("failed to load MNIST from '{}'", dataset.dir.display()))?;

    let vs = nn::VarStore::new(device);
    let root = vs.root();

    let (model, loss_fn) = match model_config {
        ModelConfig::Dcn(cfg) => {
            let model = DcnInit {
                image_size: dataset.image_size,
                n_classes: cfg.n_classes,
                ..Default::default()
            }
            .build(&root / "dcn")?;
            (Model::Dcn(model), DcnLoss::new(cfg.hint_weight))
        }
        ModelConfig::FineOnly(cfg) => {
            let model = FineOnlyInit {
                n_classes: cfg.n_classes,
                ..Default::default()
            }
            .build(&root / "fine_only");
            (Model::FineOnly(model), DcnLoss::new(0.0))
        }
    };

    let mut optimizer = nn::Adam::default().build(&vs, training.learning_rate)?;

    for epoch in 0..training.epochs {
        let mut total_loss = 0.0;
        let mut n_batches = 0;

        for (images, labels) in mnist
            .train_iter(training.batch_size)
            .shuffle()
            .to_device(device)
        {
            let input = resize(&images, dataset.image_size);
            let (logits, hint_loss) = model.forward_t(&input, true, &mut rng)?;
            let loss = loss_fn.forward(&logits, &labels, &hint_loss);
            optimizer.backward_step(&loss);

            total_loss += f64::from(&loss);
            n_batches += 1;
        }

        let accuracy = evaluate(&model, &mnist, &dataset, training.batch_size, device, &mut rng)?;
        info!(
            "epoch {:4}  train loss {:8.5}  test accuracy {:5.2}%",
            epoch,
            total_loss / n_batches as f64,
            accuracy * 100.0
        );
    }

    Ok(())
}

/// Test-set accuracy. The saliency step differentiates the coarse pass, so
/// the evaluation cannot run inside a no-grad block; the optimizer simply
/// never sees these passes.
fn evaluate<R>(
    model: &Model,
    mnist: &tch::vision::dataset::Dataset,
    dataset: &crate::config::DatasetConfig,
    batch_size: i64,
    device: Device,
    rng: &mut R,
) -> Result<f64>
where
    R: Rng + ?Sized,
{
    let mut n_correct = 0;
    let mut n_total = 0;

    for (images, labels) in mnist.test_iter(batch_size).to_device(device) {
        let input = resize(&images, dataset.image_size);
        let (logits, _hint_loss) = model.forward_t(&input, false, rng)?;

        let predictions = logits.max_dim(1, false).1;
        n_correct += i64::from(predictions.eq_tensor(&labels).count_nonzero(0));
        n_total += labels.size1()?;
    }

    Ok(n_correct as f64 / n_total as f64)
}

fn resize(images: &Tensor, image_size: i64) -> Tensor {
    images
        .view([-1, 1, 28, 28])
        .upsample_bilinear2d(&[image_size, image_size], false, None, None)
}
