use serde::{Deserialize, Serialize};

/// Schema attribute of a tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SchemaRef {
    pub name: String,
    /// Whether the schema is tracked by Liquibase. Live data never fills this in.
    pub liquibase: bool,
}

impl SchemaRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            liquibase: false,
        }
    }
}

/// Identity of a node: which database, schema and table it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub database_id: String,
    pub schema: Option<String>,
    pub table: Option<String>,
}

impl NodeKey {
    pub fn database(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            schema: None,
            table: None,
        }
    }

    pub fn schema(database_id: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            schema: Some(schema.into()),
            table: None,
        }
    }

    pub fn table(
        database_id: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database_id: database_id.into(),
            schema: Some(schema.into()),
            table: Some(table.into()),
        }
    }

    pub fn level(&self) -> usize {
        match (&self.schema, &self.table) {
            (_, Some(_)) => 2,
            (Some(_), None) => 1,
            (None, None) => 0,
        }
    }

    pub fn is_expandable(&self) -> bool {
        self.table.is_none()
    }

    pub fn parent(&self) -> Option<NodeKey> {
        match (&self.schema, &self.table) {
            (Some(schema), Some(_)) => Some(NodeKey::schema(&self.database_id, schema)),
            (Some(_), None) => Some(NodeKey::database(&self.database_id)),
            (None, _) => None,
        }
    }

    /// True when `other` sits strictly below `self`.
    pub fn contains(&self, other: &NodeKey) -> bool {
        if self.database_id != other.database_id || other.level() <= self.level() {
            return false;
        }
        match &self.schema {
            None => true,
            Some(schema) => self.table.is_none() && other.schema.as_ref() == Some(schema),
        }
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.database_id)?;
        if let Some(schema) = &self.schema {
            write!(f, "/{schema}")?;
        }
        if let Some(table) = &self.table {
            write!(f, "/{table}")?;
        }
        Ok(())
    }
}

/// Child loading progress of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    /// Never fetched, or the last fetch was cancelled.
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Last fetch failed; expanding again retries.
    Failed(String),
}

/// One row of the flattened database → schema → table tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub database_id: String,
    pub schema: Option<SchemaRef>,
    pub table: Option<String>,
    pub state: LoadState,
    /// Cached children, in provider order. Empty until the first successful fetch.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn database(database_id: impl Into<String>) -> Self {
        Self::new(database_id.into(), None, None)
    }

    pub fn schema(database_id: impl Into<String>, schema: SchemaRef) -> Self {
        Self::new(database_id.into(), Some(schema), None)
    }

    pub fn table(
        database_id: impl Into<String>,
        schema: SchemaRef,
        table: impl Into<String>,
    ) -> Self {
        Self::new(database_id.into(), Some(schema), Some(table.into()))
    }

    fn new(database_id: String, schema: Option<SchemaRef>, table: Option<String>) -> Self {
        Self {
            database_id,
            schema,
            table,
            state: LoadState::Idle,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey {
            database_id: self.database_id.clone(),
            schema: self.schema.as_ref().map(|s| s.name.clone()),
            table: self.table.clone(),
        }
    }

    pub fn level(&self) -> usize {
        if self.table.is_some() {
            2
        } else if self.schema.is_some() {
            1
        } else {
            0
        }
    }

    pub fn is_expandable(&self) -> bool {
        self.table.is_none()
    }

    pub fn display_name(&self) -> &str {
        if let Some(table) = &self.table {
            return table;
        }
        if let Some(schema) = &self.schema {
            return &schema.name;
        }
        &self.database_id
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}
