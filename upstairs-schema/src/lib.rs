pub mod connection;
pub mod field;
pub mod settings;
pub mod table;

pub use connection::{
    ConnectionProviderDetails, ConnectionProviderSummary, DatabasePlatform, SchemaSelection,
    TestStatus,
};
pub use field::FieldValue;
pub use settings::{Settings, SettingsUpdate};
pub use table::{
    AnnotationsDescriptor, ColumnDetails, ColumnUpdate, TableDetails, TableInfo, TableSummary,
};
