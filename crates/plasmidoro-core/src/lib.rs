pub mod feature;
pub mod hits;
pub mod search;
pub mod sequence;

pub use feature::*;
pub use sequence::*;
