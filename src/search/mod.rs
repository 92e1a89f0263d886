//! Range search engine

mod engine;
mod range;

pub use engine::{search, SearchStats};
pub use range::{Bound, RangeSpec};
