//! Read-only access to per-user study settings.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{StudySettings, UserId};

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Stored settings, or `None` when the user never saved any.
    async fn get_settings(&self, user: UserId) -> Result<Option<StudySettings>>;
}

/// Same settings for every user.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSettings(pub Option<StudySettings>);

#[async_trait]
impl SettingsProvider for FixedSettings {
    async fn get_settings(&self, _user: UserId) -> Result<Option<StudySettings>> {
        Ok(self.0)
    }
}
