//! Wire types shared between the contract document service and its callers.

pub mod model;
