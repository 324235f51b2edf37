//! Taint kinds
//!
//! A kind is the category of a source, sink or propagation, e.g.
//! "UserControlledInput". The set of kind shapes is closed within the
//! analysis, so kinds are a tagged variant rather than an open hierarchy.
//! Kinds are interned; the engine compares them through `KindId` handles.

use std::fmt;

use super::access_path::Root;

/// Interned kind handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KindId(pub u32);

/// The closed set of kind shapes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// A named source/sink category from the rule set.
    Named(String),

    /// Tracks an inferred flow from the given input port through the method.
    Propagation(Root),

    /// A base kind seen through a named transform.
    Transform { base: KindId, transform: String },

    /// Artificial taint tracking the flow of an argument within the current
    /// method, used to infer sinks and propagations without a separate
    /// backward pass for every port.
    LocalArgument(u32),

    /// Artificial taint tracking the current method's return value.
    LocalReturn,
}

impl Kind {
    /// Create a named kind
    pub fn named(name: impl Into<String>) -> Self {
        Kind::Named(name.into())
    }

    /// Whether this kind is artificial local-tracking taint
    pub fn is_artificial(&self) -> bool {
        matches!(self, Kind::LocalArgument(_) | Kind::LocalReturn)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Named(name) => write!(f, "{}", name),
            Kind::Propagation(Root::Return) => write!(f, "Propagation[Return]"),
            Kind::Propagation(Root::Argument(position)) => {
                write!(f, "Propagation[Argument({})]", position)
            }
            Kind::Transform { base, transform } => {
                write!(f, "{}@kind#{}", transform, base.0)
            }
            Kind::LocalArgument(position) => write!(f, "LocalArgument({})", position),
            Kind::LocalReturn => write!(f, "LocalReturn"),
        }
    }
}
