use tracing::{info, warn};
use upstairs_schema::{ConnectionProviderDetails, ConnectionProviderSummary, DatabasePlatform};

use crate::api::UpstairsClient;
use crate::error::UpstairsError;
use crate::tree::{LazyTreeDataSource, TreeNode};

/// Whether the selected connection is shown read-only or as an editable form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanelMode {
    #[default]
    View,
    Edit,
}

/// Connection list plus the currently opened connection.
pub struct ConnectionsPanel {
    client: UpstairsClient,
    tree: LazyTreeDataSource,
    connections: Vec<ConnectionProviderSummary>,
    selected: Option<ConnectionProviderDetails>,
    mode: PanelMode,
    platforms: Vec<(String, DatabasePlatform)>,
}

impl ConnectionsPanel {
    pub fn new(client: UpstairsClient, tree: LazyTreeDataSource) -> Self {
        Self {
            client,
            tree,
            connections: Vec::new(),
            selected: None,
            mode: PanelMode::View,
            platforms: Vec::new(),
        }
    }

    pub fn connections(&self) -> &[ConnectionProviderSummary] {
        &self.connections
    }

    pub fn selected(&self) -> Option<&ConnectionProviderDetails> {
        self.selected.as_ref()
    }

    /// Form binding for the opened connection; only meaningful in edit mode.
    pub fn selected_mut(&mut self) -> Option<&mut ConnectionProviderDetails> {
        self.selected.as_mut()
    }

    pub fn mode(&self) -> PanelMode {
        self.mode
    }

    pub fn platforms(&self) -> &[(String, DatabasePlatform)] {
        &self.platforms
    }

    /// Fetch the connection list and reset the tree to one database node per connection.
    pub async fn load(&mut self) -> Result<&[ConnectionProviderSummary], UpstairsError> {
        let connections = self.client.list_connections().await?;
        let roots = connections
            .iter()
            .map(|c| TreeNode::database(&c.name))
            .collect();
        self.tree.set_roots(roots)?;
        info!(count = connections.len(), "Connections loaded");
        self.connections = connections;
        Ok(&self.connections)
    }

    pub async fn open(&mut self, name: &str) -> Result<&ConnectionProviderDetails, UpstairsError> {
        let details = self.client.get_connection(name).await?;
        self.mode = PanelMode::View;
        Ok(self.selected.insert(details))
    }

    pub fn edit(&mut self) -> Result<(), UpstairsError> {
        self.require_view()?;
        self.mode = PanelMode::Edit;
        Ok(())
    }

    pub async fn save(&mut self) -> Result<(), UpstairsError> {
        if self.mode != PanelMode::Edit {
            return Err(UpstairsError::Validation(
                "connection is not being edited".to_string(),
            ));
        }
        let details = self.require_selected()?;
        self.client.save_connection(details).await?;
        self.mode = PanelMode::View;
        Ok(())
    }

    pub async fn delete(&mut self) -> Result<(), UpstairsError> {
        self.require_view()?;
        let name = self.require_selected()?.name().to_string();
        self.client.delete_connection(&name).await?;
        self.connections.retain(|c| c.name != name);
        self.selected = None;
        self.mode = PanelMode::View;
        Ok(())
    }

    /// Run the backend connection test. `true` when the backend reports `connected`.
    pub async fn test(&self) -> Result<bool, UpstairsError> {
        self.require_view()?;
        let name = self.require_selected()?.name();
        let status = self.client.test_connection(name).await?;
        if status.is_connected() {
            info!(connection = %name, "Connection tested successfully");
        } else {
            warn!(connection = %name, status = ?status.0, "Connection test did not connect");
        }
        Ok(status.is_connected())
    }

    pub async fn synchronize(&self) -> Result<(), UpstairsError> {
        self.require_view()?;
        let name = self.require_selected()?.name();
        self.client.synchronize_connection(name).await
    }

    /// Drop the opened connection without saving.
    pub fn close(&mut self) {
        self.selected = None;
        self.mode = PanelMode::View;
    }

    pub async fn load_platforms(
        &mut self,
    ) -> Result<&[(String, DatabasePlatform)], UpstairsError> {
        self.platforms = self.client.list_platforms().await?;
        Ok(&self.platforms)
    }

    fn require_selected(&self) -> Result<&ConnectionProviderDetails, UpstairsError> {
        self.selected
            .as_ref()
            .ok_or_else(|| UpstairsError::Validation("no connection selected".to_string()))
    }

    fn require_view(&self) -> Result<(), UpstairsError> {
        self.require_selected()?;
        if self.mode == PanelMode::Edit {
            return Err(UpstairsError::Validation(
                "finish editing the connection first".to_string(),
            ));
        }
        Ok(())
    }
}
