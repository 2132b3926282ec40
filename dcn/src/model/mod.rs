mod coarse;
mod fine;
mod fine_only;
mod top;

pub use coarse::*;
pub use fine::*;
pub use fine_only::*;
pub use top::*;
