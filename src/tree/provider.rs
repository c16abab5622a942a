use async_trait::async_trait;
use upstairs_schema::{SchemaSelection, TableSummary};

use super::node::{SchemaRef, TreeNode};
use crate::error::MetadataError;

/// Source of child metadata for the tree.
#[async_trait]
pub trait MetadataProvider: Send + Sync + 'static {
    /// Schemas of a connection, in backend order.
    async fn list_schemas(&self, database_id: &str) -> Result<Vec<SchemaSelection>, MetadataError>;

    /// Tables of one schema, in backend order.
    async fn list_tables(
        &self,
        database_id: &str,
        schema: &str,
    ) -> Result<Vec<TableSummary>, MetadataError>;
}

/// Fetch and build the children of `parent`.
///
/// Database nodes get one schema node per entry of the connection's schema list;
/// schema nodes get one table node per table. Tables have no children.
pub async fn fetch_children(
    provider: &dyn MetadataProvider,
    parent: &TreeNode,
) -> Result<Vec<TreeNode>, MetadataError> {
    match (&parent.schema, &parent.table) {
        (_, Some(_)) => Ok(Vec::new()),
        (Some(schema), None) => {
            let tables = provider
                .list_tables(&parent.database_id, &schema.name)
                .await?;
            Ok(tables
                .into_iter()
                .map(|t| TreeNode::table(&parent.database_id, schema.clone(), t.name))
                .collect())
        }
        (None, None) => {
            let schemas = provider.list_schemas(&parent.database_id).await?;
            // Liquibase tracking is not reported by the connection endpoint.
            Ok(schemas
                .into_iter()
                .map(|s| TreeNode::schema(&parent.database_id, SchemaRef::new(s.schema)))
                .collect())
        }
    }
}
