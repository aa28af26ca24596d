use serde::{Deserialize, Serialize};

/// Configuration for the grouper module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrouperConfig {
    /// Path prefix the REST routes are nested under ("" mounts them at the root).
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// Records created at startup through the regular create path.
    #[serde(default)]
    pub seed: Option<SeedConfig>,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            api_prefix: default_api_prefix(),
            max_name_length: default_max_name_length(),
            seed: None,
        }
    }
}

impl GrouperConfig {
    /// Normalized prefix: no trailing slash, "" for the root.
    pub fn normalized_prefix(&self) -> anyhow::Result<String> {
        let trimmed = self.api_prefix.trim().trim_end_matches('/');
        if !trimmed.is_empty() && !trimmed.starts_with('/') {
            anyhow::bail!(
                "grouper.api_prefix must start with '/' (got '{}')",
                self.api_prefix
            );
        }
        Ok(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    #[serde(default)]
    pub groups: Vec<SeedGroup>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedGroup {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    /// Group names; each must appear in `seed.groups`.
    #[serde(default)]
    pub groups: Vec<String>,
}

fn default_api_prefix() -> String {
    "/grouper/api/v1".to_string()
}

fn default_max_name_length() -> usize {
    100
}
