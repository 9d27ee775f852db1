pub mod binary;
pub mod string;
pub mod value;

pub extern crate uuid;

pub use value::{Type, Value};
