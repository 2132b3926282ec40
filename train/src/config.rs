//! Training program configuration format.

use crate::common::*;

pub use dataset::*;
pub use model::*;
pub use training::*;

/// The main training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

mod model {
    use super::*;

    /// The model configuration.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "kind")]
    pub enum ModelConfig {
        /// Coarse-to-fine pipeline with saliency-driven refinement.
        Dcn(DcnModelConfig),
        /// Baseline running the fine stack over the full image.
        FineOnly(FineOnlyModelConfig),
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DcnModelConfig {
        pub n_classes: usize,
        pub hint_weight: f64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FineOnlyModelConfig {
        pub n_classes: usize,
    }
}

mod dataset {
    use super::*;

    /// The dataset configuration.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DatasetConfig {
        /// directory holding the MNIST files
        pub dir: PathBuf,
        /// side length the images are resized to before the forward pass
        pub image_size: i64,
    }
}

mod training {
    use super::*;

    /// The training configuration.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TrainingConfig {
        pub batch_size: i64,
        pub epochs: usize,
        pub learning_rate: f64,
        pub seed: u64,
    }
}
