pub mod gate1;
pub mod gate2;
pub mod gate3;

pub use gate1::*;
pub use gate2::*;
pub use gate3::*;
