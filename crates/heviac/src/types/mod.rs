//! Type model shared by every phase
//!
//! Types are named, not structural: two types are the same when their
//! names are the same. Native primitives carry a [`NativeType`] tag so
//! emitters can map them without string matching.

mod native;
mod operator;

pub use native::{NativeType, TypeDesc};
pub use operator::{Associativity, NativeOperator, OperatorClass, UnaryClass, native_binary, native_unary};
