mod tracker;

pub use tracker::*;
