//! Contract data shaping: everything between a `ContractRecord` and the
//! values a template sees.

pub mod context;
pub mod format;
pub mod months;
pub mod words;
