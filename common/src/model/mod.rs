pub mod contract;
pub mod diagnostic;
pub mod generation;
