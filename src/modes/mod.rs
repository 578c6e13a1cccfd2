mod consume;
mod copy;
mod map;
mod produce;
mod simulate;

pub use consume::*;
pub use copy::*;
pub use map::*;
pub use produce::*;
pub use simulate::*;
