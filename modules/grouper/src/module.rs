use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::Context;
use api_ingress::{ApiIngress, RestfulModule};
use arc_swap::{ArcSwap, ArcSwapOption};
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::{GrouperConfig, SeedConfig};
use crate::contract::client::GrouperApi;
use crate::contract::model::{GroupId, NewGroup, NewUser};
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::GrouperLocalClient;
use crate::infra::storage::InMemoryDirectory;

/// The membership directory module: owns the in-memory store and the domain
/// service, and mounts the REST routes on the ingress router.
#[derive(Default)]
pub struct Grouper {
    service: ArcSwapOption<Service>,
    config: ArcSwap<GrouperConfig>,
}

impl Grouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn init(&self, cfg: GrouperConfig) -> anyhow::Result<()> {
        info!("Initializing grouper module");
        debug!(
            "Loaded grouper config: api_prefix={}, max_name_length={}",
            cfg.api_prefix, cfg.max_name_length
        );
        // Fail at startup rather than when routes get mounted
        cfg.normalized_prefix()?;

        let repo = InMemoryDirectory::new();
        let service = Service::new(
            Arc::new(repo),
            ServiceConfig {
                max_name_length: cfg.max_name_length,
            },
        );

        if let Some(seed) = &cfg.seed {
            seed_directory(&service, seed).await?;
        }

        self.service.store(Some(Arc::new(service)));
        self.config.store(Arc::new(cfg));
        Ok(())
    }

    pub fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("grouper service not initialized"))
    }

    /// In-process client for other modules.
    pub fn client(&self) -> anyhow::Result<Arc<dyn GrouperApi>> {
        let api: Arc<dyn GrouperApi> = Arc::new(GrouperLocalClient::new(self.service()?));
        Ok(api)
    }
}

impl RestfulModule for Grouper {
    fn register_rest(
        &self,
        router: axum::Router,
        ingress: &ApiIngress,
    ) -> anyhow::Result<axum::Router> {
        info!("Registering grouper REST routes");

        let service = self.service()?;
        let prefix = self.config.load().normalized_prefix()?;

        let router = routes::register_routes(router, service, &prefix)?;
        ingress.register_openapi(routes::openapi(&prefix));
        info!("Grouper REST routes registered under '{}'", prefix);
        Ok(router)
    }
}

/// Create the configured groups, then the users, through the regular service
/// path so seeded records obey the same rules as API-created ones.
async fn seed_directory(service: &Service, seed: &SeedConfig) -> anyhow::Result<()> {
    let mut group_ids: HashMap<&str, GroupId> = HashMap::new();

    for group in &seed.groups {
        let created = service
            .create_group(NewGroup {
                name: group.name.clone(),
                ..Default::default()
            })
            .await
            .with_context(|| format!("failed to seed group '{}'", group.name))?;
        group_ids.insert(group.name.as_str(), created.id);
    }

    for user in &seed.users {
        let groups: BTreeSet<GroupId> = user
            .groups
            .iter()
            .map(|name| {
                group_ids.get(name.as_str()).copied().ok_or_else(|| {
                    anyhow::anyhow!(
                        "seed user '{}' references unknown group '{}'",
                        user.name,
                        name
                    )
                })
            })
            .collect::<anyhow::Result<_>>()?;

        service
            .create_user(NewUser {
                name: user.name.clone(),
                email: user.email.clone(),
                groups,
            })
            .await
            .with_context(|| format!("failed to seed user '{}'", user.name))?;
    }

    info!(
        groups = seed.groups.len(),
        users = seed.users.len(),
        "Seeded membership directory"
    );
    Ok(())
}
