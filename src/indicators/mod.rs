pub mod atr;
pub mod bb;
pub mod ema;
pub mod rsi;
pub mod swings;

pub use atr::*;
pub use bb::*;
pub use ema::*;
pub use rsi::*;
pub use swings::*;
