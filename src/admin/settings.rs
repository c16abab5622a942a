use upstairs_schema::SettingsUpdate;

use crate::api::UpstairsClient;
use crate::error::UpstairsError;

/// Application settings form: `appName` and `loginPath`, both required.
pub struct SettingsPanel {
    client: UpstairsClient,
    form: SettingsUpdate,
}

impl SettingsPanel {
    pub fn new(client: UpstairsClient) -> Self {
        Self {
            client,
            form: SettingsUpdate::default(),
        }
    }

    pub fn form(&self) -> &SettingsUpdate {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SettingsUpdate {
        &mut self.form
    }

    /// Discard local edits and reload the stored values.
    pub async fn reset(&mut self) -> Result<&SettingsUpdate, UpstairsError> {
        let settings = self.client.get_settings().await?;
        self.form = SettingsUpdate {
            app_name: settings.app_name.value.unwrap_or_default(),
            login_path: settings.login_path.value.unwrap_or_default(),
        };
        Ok(&self.form)
    }

    pub async fn save(&self) -> Result<(), UpstairsError> {
        self.validate()?;
        self.client.save_settings(&self.form).await
    }

    fn validate(&self) -> Result<(), UpstairsError> {
        for (field, value) in [
            ("appName", &self.form.app_name),
            ("loginPath", &self.form.login_path),
        ] {
            if value.trim().is_empty() {
                return Err(UpstairsError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}
