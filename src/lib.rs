pub mod admin;
pub mod api;
pub mod config;
pub mod error;
pub mod tree;
pub mod utils;

pub use api::UpstairsClient;
pub use config::Config;
pub use error::{MetadataError, UpstairsError};
pub use tree::{ExpansionTracker, LazyTreeDataSource, NodeKey, TreeNode};
