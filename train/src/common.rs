pub use anyhow::{bail, ensure, Context, Error, Result};
pub use log::info;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::path::{Path, PathBuf};
pub use tch::{
    nn::{self, ModuleT as _, OptimizerConfig as _},
    Device, Kind, Tensor,
};
