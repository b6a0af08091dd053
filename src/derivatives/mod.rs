pub mod cache;
pub mod series;

pub use cache::TtlCache;
pub use series::{DerivativesEngine, Gate2Context};
