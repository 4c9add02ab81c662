use std::sync::Arc;

use tracing::instrument;

use wrenchbook_catalog::{RegisterService, Service, ServiceId, UpdateService};

use crate::audit::AuditTrail;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, Filter, Repository};

use super::{OperationContext, details, require};

/// Service catalog: what the shop sells as labour.
#[derive(Clone)]
pub struct CatalogService {
    services: Repository<Service>,
    audit: AuditTrail,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>, audit: AuditTrail) -> Self {
        Self {
            services: Repository::new(store),
            audit,
        }
    }

    async fn ensure_code_free(&self, code: &str, owner: Option<ServiceId>) -> ServiceResult<()> {
        let taken = self.services.find(&[Filter::eq("code", code)]).await?;
        if taken.iter().any(|s| Some(s.id_typed()) != owner) {
            return Err(ServiceError::validation(format!(
                "service code {code} is already in use"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, cmd), fields(service_id = %cmd.service_id), err)]
    pub async fn create(&self, ctx: &OperationContext, cmd: RegisterService) -> ServiceResult<Service> {
        let service = Service::register(cmd)?;
        self.ensure_code_free(service.code(), None).await?;
        self.services.save(&service).await?;

        tracing::info!(code = service.code(), "catalog service created");
        self.audit
            .record(
                ctx,
                "service.created",
                "service",
                service.id_typed().as_aggregate(),
                details(&service),
            )
            .await;
        Ok(service)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn update(
        &self,
        ctx: &OperationContext,
        id: ServiceId,
        cmd: UpdateService,
    ) -> ServiceResult<Service> {
        let mut service = require(&self.services, id.as_aggregate(), "service").await?;
        service.update(cmd, ctx.at)?;
        self.ensure_code_free(service.code(), Some(id)).await?;
        self.services.save(&service).await?;

        self.audit
            .record(ctx, "service.updated", "service", id.as_aggregate(), details(&service))
            .await;
        Ok(service)
    }

    #[instrument(skip(self), err)]
    pub async fn deactivate(&self, ctx: &OperationContext, id: ServiceId) -> ServiceResult<Service> {
        let mut service = require(&self.services, id.as_aggregate(), "service").await?;
        service.deactivate(ctx.at);
        self.services.save(&service).await?;

        self.audit
            .record(ctx, "service.deactivated", "service", id.as_aggregate(), serde_json::Value::Null)
            .await;
        Ok(service)
    }

    pub async fn get(&self, id: ServiceId) -> ServiceResult<Service> {
        require(&self.services, id.as_aggregate(), "service").await
    }

    /// Active services matching `search` (all when `None`), by name.
    pub async fn list(&self, search: Option<&str>) -> ServiceResult<Vec<Service>> {
        let mut services: Vec<Service> = self
            .services
            .find(&[Filter::eq("active", true)])
            .await?
            .into_iter()
            .filter(|s| search.is_none_or(|term| s.matches(term)))
            .collect();
        services.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(services)
    }
}
