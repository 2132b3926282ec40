pub use anyhow::{bail, ensure, format_err, Context, Error, Result};
pub use noisy_float::prelude::*;
pub use std::borrow::Borrow;
pub use tch::{
    nn::{self, Module as _, ModuleT as _},
    Device, Kind, Reduction, Tensor,
};
