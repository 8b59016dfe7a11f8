//! Core data types: clocks, temporal keys and typed values

pub mod key;
pub mod temporal;
pub mod value;

pub use key::*;
pub use temporal::*;
pub use value::*;
