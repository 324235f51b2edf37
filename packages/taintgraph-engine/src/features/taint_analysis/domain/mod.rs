// Taint abstract-domain stack: frames, kind-grouped taint, access-path
// trees, environments, and per-method models.

pub mod access_path;
pub mod access_path_tree;
pub mod environment;
pub mod frame;
pub mod interners;
pub mod issue;
pub mod kind;
pub mod model;
pub mod propagation;
pub mod taint;
pub mod taint_tree;

pub use access_path::{AccessPath, FieldId, Path, Root};
pub use access_path_tree::TaintAccessPathTree;
pub use environment::{Environment, MemoryLocation};
pub use frame::Frame;
pub use interners::{FeatureId, Interners, MethodId};
pub use issue::{Issue, IssueKey, IssueSet};
pub use kind::{Kind, KindId};
pub use model::{Model, Modes};
pub use propagation::PropagationSet;
pub use taint::Taint;
pub use taint_tree::{TaintTree, UpdateKind};
