//! State holders for the admin panel forms.
//!
//! Each panel owns the data its form shows and talks to the backend through
//! [`UpstairsClient`](crate::api::UpstairsClient). Failed calls leave the
//! panel state as it was before the call.

mod connections;
mod settings;
mod tables;

pub use connections::{ConnectionsPanel, PanelMode};
pub use settings::SettingsPanel;
pub use tables::{
    ColumnSelection, DEFAULT_JAVA_TYPE, OpenTable, TableEditor, denormalize_java_type,
    normalize_java_types,
};
