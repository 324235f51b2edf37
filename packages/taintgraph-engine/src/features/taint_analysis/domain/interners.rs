//! Process-scoped interning for analysis entities
//!
//! The engine compares methods, kinds, fields and features by identity. The
//! `Interners` aggregate owns one interner per entity family and is passed
//! by reference into the engine's construction; all components of one
//! analysis must share the same aggregate.

use crate::shared::Interner;

use super::access_path::{FieldId, Root};
use super::kind::{Kind, KindId};

/// Interned method handle. The engine treats methods as opaque identities;
/// the embedder decides what the interned string means (usually a fully
/// qualified signature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(pub u32);

/// Interned feature tag, e.g. "via-numerical-operator".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u32);

/// One interner per entity family.
pub struct Interners {
    methods: Interner<String>,
    kinds: Interner<Kind>,
    fields: Interner<String>,
    features: Interner<String>,
}

impl Interners {
    pub fn new() -> Self {
        Self {
            methods: Interner::new(),
            kinds: Interner::new(),
            fields: Interner::new(),
            features: Interner::new(),
        }
    }

    /// Intern a method by name
    pub fn method(&self, name: impl Into<String>) -> MethodId {
        MethodId(self.methods.intern(name.into()))
    }

    /// Resolve a method id back to its name
    pub fn method_name(&self, id: MethodId) -> String {
        self.methods.resolve(id.0)
    }

    /// Intern a kind
    pub fn kind(&self, kind: Kind) -> KindId {
        KindId(self.kinds.intern(kind))
    }

    /// Intern a named kind
    pub fn named_kind(&self, name: impl Into<String>) -> KindId {
        self.kind(Kind::Named(name.into()))
    }

    /// Intern the propagation kind for an input root
    pub fn propagation_kind(&self, input: Root) -> KindId {
        self.kind(Kind::Propagation(input))
    }

    /// Resolve a kind id
    pub fn resolve_kind(&self, id: KindId) -> Kind {
        self.kinds.resolve(id.0)
    }

    /// Intern a field-name selector
    pub fn field(&self, name: impl Into<String>) -> FieldId {
        FieldId(self.fields.intern(name.into()))
    }

    /// Resolve a field id
    pub fn field_name(&self, id: FieldId) -> String {
        self.fields.resolve(id.0)
    }

    /// Intern a feature tag
    pub fn feature(&self, name: impl Into<String>) -> FeatureId {
        FeatureId(self.features.intern(name.into()))
    }

    /// Resolve a feature id
    pub fn feature_name(&self, id: FeatureId) -> String {
        self.features.resolve(id.0)
    }
}

impl Default for Interners {
    fn default() -> Self {
        Self::new()
    }
}
