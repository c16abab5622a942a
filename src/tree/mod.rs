mod actor;
mod expansion;
mod model;
mod node;
mod provider;

pub use actor::{LazyTreeDataSource, Snapshot};
pub use expansion::{ExpansionChange, ExpansionTracker};
pub use model::{CollapseOutcome, ExpandOutcome, TreeModel};
pub use node::{LoadState, NodeKey, SchemaRef, TreeNode};
pub use provider::{MetadataProvider, fetch_children};
