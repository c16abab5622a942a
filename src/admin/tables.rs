use serde_json::{Map, Value};
use tracing::warn;
use upstairs_schema::{AnnotationsDescriptor, ColumnDetails, ColumnUpdate, TableDetails, TableInfo};

use crate::api::UpstairsClient;
use crate::error::UpstairsError;
use crate::tree::TreeNode;

/// Form value standing in for "no explicit Java type".
pub const DEFAULT_JAVA_TYPE: &str = "default";

/// Show missing Java types as [`DEFAULT_JAVA_TYPE`].
pub fn normalize_java_types(table: &mut TableDetails) {
    for column in &mut table.columns {
        if column.java_type.as_deref().is_none_or(str::is_empty) {
            column.java_type = Some(DEFAULT_JAVA_TYPE.to_string());
        }
    }
}

/// Inverse of [`normalize_java_types`] for one column, applied before sending.
pub fn denormalize_java_type(column: &mut ColumnDetails) {
    if column.java_type.as_deref() == Some(DEFAULT_JAVA_TYPE) {
        column.java_type = None;
    }
}

/// A table opened from the tree, with the path it was opened under.
#[derive(Debug, Clone)]
pub struct OpenTable {
    pub database: String,
    pub schema: String,
    pub info: TableInfo,
}

/// The column whose annotations are being edited.
#[derive(Debug, Clone)]
pub struct ColumnSelection {
    /// Position in `OpenTable::info.table.columns`.
    pub index: usize,
    pub descriptor: AnnotationsDescriptor,
}

pub struct TableEditor {
    client: UpstairsClient,
    table: Option<OpenTable>,
    column: Option<ColumnSelection>,
}

impl TableEditor {
    pub fn new(client: UpstairsClient) -> Self {
        Self {
            client,
            table: None,
            column: None,
        }
    }

    pub fn table(&self) -> Option<&OpenTable> {
        self.table.as_ref()
    }

    pub fn table_mut(&mut self) -> Option<&mut OpenTable> {
        self.table.as_mut()
    }

    pub fn column(&self) -> Option<&ColumnSelection> {
        self.column.as_ref()
    }

    pub fn selected_column(&self) -> Option<&ColumnDetails> {
        let index = self.column.as_ref()?.index;
        self.table.as_ref()?.info.table.columns.get(index)
    }

    /// Load the table behind a table node of the tree.
    pub async fn open(&mut self, node: &TreeNode) -> Result<&OpenTable, UpstairsError> {
        let (Some(schema), Some(table)) = (&node.schema, &node.table) else {
            return Err(UpstairsError::Validation(format!(
                "{} is not a table node",
                node.key()
            )));
        };

        let mut info = self
            .client
            .get_table(&node.database_id, &schema.name, table)
            .await?;
        normalize_java_types(&mut info.table);

        self.column = None;
        Ok(self.table.insert(OpenTable {
            database: node.database_id.clone(),
            schema: schema.name.clone(),
            info,
        }))
    }

    pub async fn save(&self) -> Result<(), UpstairsError> {
        let open = self.require_table()?;
        let mut details = open.info.table.clone();
        for column in &mut details.columns {
            denormalize_java_type(column);
        }

        self.client
            .save_table(&open.database, &open.schema, &details)
            .await
            .inspect_err(|e| {
                warn!(table = %details.table_name, error = %e, "Table save failed");
            })
    }

    pub fn cancel(&mut self) {
        self.table = None;
        self.column = None;
    }

    /// Select a column and load the annotation form for its current type.
    pub async fn edit_column(&mut self, index: usize) -> Result<&ColumnSelection, UpstairsError> {
        let open = self.require_table()?;
        let column = open.info.table.columns.get(index).ok_or_else(|| {
            UpstairsError::Validation(format!("table has no column at index {index}"))
        })?;
        let java_type = column
            .java_type
            .clone()
            .unwrap_or_else(|| DEFAULT_JAVA_TYPE.to_string());

        let descriptor = self.fetch_annotations(open, column, &java_type).await?;
        Ok(self.column.insert(ColumnSelection { index, descriptor }))
    }

    /// Switch the selected column to `java_type` and reload its annotation form.
    pub async fn change_type(
        &mut self,
        java_type: &str,
    ) -> Result<&ColumnSelection, UpstairsError> {
        let index = self
            .column
            .as_ref()
            .map(|c| c.index)
            .ok_or_else(|| UpstairsError::Validation("no column selected".to_string()))?;
        let open = self.require_table()?;
        let column = open.info.table.columns.get(index).ok_or_else(|| {
            UpstairsError::Validation(format!("table has no column at index {index}"))
        })?;

        let descriptor = self.fetch_annotations(open, column, java_type).await?;

        if let Some(column) = self
            .table
            .as_mut()
            .and_then(|t| t.info.table.columns.get_mut(index))
        {
            column.java_type = Some(java_type.to_string());
        }
        Ok(self.column.insert(ColumnSelection { index, descriptor }))
    }

    /// Save the selected column together with the edited annotation values.
    pub async fn save_column(&self, annotations: Map<String, Value>) -> Result<(), UpstairsError> {
        let open = self.require_table()?;
        let mut column = self
            .selected_column()
            .cloned()
            .ok_or_else(|| UpstairsError::Validation("no column selected".to_string()))?;
        denormalize_java_type(&mut column);

        let update = ColumnUpdate {
            column,
            annotations,
        };
        self.client
            .save_column(
                &open.database,
                &open.schema,
                &open.info.table.table_name,
                &update,
            )
            .await
    }

    pub fn cancel_column(&mut self) {
        self.column = None;
    }

    fn require_table(&self) -> Result<&OpenTable, UpstairsError> {
        self.table
            .as_ref()
            .ok_or_else(|| UpstairsError::Validation("no table open".to_string()))
    }

    async fn fetch_annotations(
        &self,
        open: &OpenTable,
        column: &ColumnDetails,
        java_type: &str,
    ) -> Result<AnnotationsDescriptor, UpstairsError> {
        self.client
            .column_annotations(
                &open.database,
                &open.schema,
                &open.info.table.table_name,
                &column.column_name,
                java_type,
            )
            .await
    }
}
