pub mod htf_bias;
pub mod liquidity;
pub mod structure_1h;
pub mod zones;

pub use htf_bias::*;
pub use liquidity::*;
pub use structure_1h::*;
pub use zones::*;
