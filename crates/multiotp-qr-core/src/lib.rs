#![doc = include_str!("../README.md")]

mod common;
mod diff;
mod report;

pub use crate::common::*;
pub use crate::diff::*;
pub use crate::report::*;
