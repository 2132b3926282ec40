pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use dcn_modules::{BatchNormInit, ConvBn2DInit, CrossEntropyLoss, HintLoss, LinearBnInit};
pub use itertools::Itertools as _;
pub use log::info;
pub use rand::{prelude::*, seq::SliceRandom};
pub use std::borrow::Borrow;
pub use tch::{
    nn::{self, ModuleT as _},
    Device, IndexOp, Kind, Reduction, Tensor,
};
