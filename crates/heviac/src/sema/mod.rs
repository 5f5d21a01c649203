//! Semantic analysis: scopes, type resolution, reference marks and
//! member/call checks. The visitors here run as the semantic phase of the
//! [`Walker`](crate::walk::Walker).

mod member;
mod reference;
mod resolve;
mod scope;
mod visit;

pub use scope::{Binding, NativeFunction, Scope, ScopeArena, ScopeId};
