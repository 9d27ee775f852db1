mod deserialization;
mod error;
mod macros;
mod serialization;

pub use deserialization::*;
pub use error::*;
pub use serialization::*;
