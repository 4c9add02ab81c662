use std::sync::Arc;

use tracing::instrument;

use wrenchbook_parties::{
    Client, ClientId, RecordMaintenance, RegisterClient, RegisterStaff, RegisterSupplier,
    RegisterVehicle, StaffId, StaffMember, Supplier, SupplierId, UpdateClient, UpdateVehicle,
    Vehicle, VehicleId, normalize_plate,
};
use wrenchbook_service_orders::ServiceOrder;

use crate::audit::AuditTrail;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, Filter, Repository};

use super::{OperationContext, details, require};

/// Clients, their vehicles, suppliers, and shop staff.
#[derive(Clone)]
pub struct PartyService {
    clients: Repository<Client>,
    vehicles: Repository<Vehicle>,
    staff: Repository<StaffMember>,
    suppliers: Repository<Supplier>,
    orders: Repository<ServiceOrder>,
    audit: AuditTrail,
}

impl PartyService {
    pub fn new(store: Arc<dyn DocumentStore>, audit: AuditTrail) -> Self {
        Self {
            clients: Repository::new(store.clone()),
            vehicles: Repository::new(store.clone()),
            staff: Repository::new(store.clone()),
            suppliers: Repository::new(store.clone()),
            orders: Repository::new(store),
            audit,
        }
    }

    // ----- clients -------------------------------------------------------

    async fn ensure_tax_id_free(&self, tax_id: &str, owner: Option<ClientId>) -> ServiceResult<()> {
        let taken = self.clients.find(&[Filter::eq("tax_id", tax_id)]).await?;
        if taken.iter().any(|c| Some(c.id_typed()) != owner) {
            return Err(ServiceError::validation(format!(
                "a client with tax id {tax_id} already exists"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, cmd), fields(client_id = %cmd.client_id), err)]
    pub async fn create_client(&self, ctx: &OperationContext, cmd: RegisterClient) -> ServiceResult<Client> {
        let client = Client::register(cmd)?;
        self.ensure_tax_id_free(client.tax_id(), None).await?;
        self.clients.save(&client).await?;

        tracing::info!("client registered");
        self.audit
            .record(ctx, "client.created", "client", client.id_typed().as_aggregate(), details(&client))
            .await;
        Ok(client)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn update_client(
        &self,
        ctx: &OperationContext,
        id: ClientId,
        cmd: UpdateClient,
    ) -> ServiceResult<Client> {
        let mut client = require(&self.clients, id.as_aggregate(), "client").await?;
        client.update(cmd, ctx.at)?;
        self.ensure_tax_id_free(client.tax_id(), Some(id)).await?;
        self.clients.save(&client).await?;

        self.audit
            .record(ctx, "client.updated", "client", id.as_aggregate(), details(&client))
            .await;
        Ok(client)
    }

    /// Soft delete: the client stays referenced by history but leaves listings.
    #[instrument(skip(self), err)]
    pub async fn deactivate_client(&self, ctx: &OperationContext, id: ClientId) -> ServiceResult<Client> {
        let mut client = require(&self.clients, id.as_aggregate(), "client").await?;
        client.deactivate(ctx.at);
        self.clients.save(&client).await?;

        self.audit
            .record(ctx, "client.deactivated", "client", id.as_aggregate(), serde_json::Value::Null)
            .await;
        Ok(client)
    }

    pub async fn get_client(&self, id: ClientId) -> ServiceResult<Client> {
        require(&self.clients, id.as_aggregate(), "client").await
    }

    /// Active clients, optionally narrowed by a search term, by name.
    pub async fn list_clients(&self, search: Option<&str>) -> ServiceResult<Vec<Client>> {
        let mut clients: Vec<Client> = self
            .clients
            .find(&[Filter::eq("active", true)])
            .await?
            .into_iter()
            .filter(|c| search.is_none_or(|term| c.matches(term)))
            .collect();
        clients.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(clients)
    }

    // ----- vehicles ------------------------------------------------------

    async fn ensure_plate_free(&self, plate: &str, owner: Option<VehicleId>) -> ServiceResult<()> {
        let taken = self.vehicles.find(&[Filter::eq("plate", plate)]).await?;
        if taken.iter().any(|v| Some(v.id_typed()) != owner) {
            return Err(ServiceError::validation(format!(
                "a vehicle with plate {plate} already exists"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self, cmd), fields(vehicle_id = %cmd.vehicle_id), err)]
    pub async fn create_vehicle(&self, ctx: &OperationContext, cmd: RegisterVehicle) -> ServiceResult<Vehicle> {
        require(&self.clients, cmd.client_id.as_aggregate(), "client").await?;
        let vehicle = Vehicle::register(cmd)?;
        self.ensure_plate_free(vehicle.plate(), None).await?;
        self.vehicles.save(&vehicle).await?;

        tracing::info!(plate = vehicle.plate(), "vehicle registered");
        self.audit
            .record(ctx, "vehicle.created", "vehicle", vehicle.id_typed().as_aggregate(), details(&vehicle))
            .await;
        Ok(vehicle)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn update_vehicle(
        &self,
        ctx: &OperationContext,
        id: VehicleId,
        cmd: UpdateVehicle,
    ) -> ServiceResult<Vehicle> {
        let mut vehicle = require(&self.vehicles, id.as_aggregate(), "vehicle").await?;
        vehicle.update(cmd, ctx.at)?;
        self.ensure_plate_free(vehicle.plate(), Some(id)).await?;
        self.vehicles.save(&vehicle).await?;

        self.audit
            .record(ctx, "vehicle.updated", "vehicle", id.as_aggregate(), details(&vehicle))
            .await;
        Ok(vehicle)
    }

    /// Hard delete, refused while any service order points at the vehicle.
    #[instrument(skip(self), err)]
    pub async fn delete_vehicle(&self, ctx: &OperationContext, id: VehicleId) -> ServiceResult<()> {
        let vehicle = require(&self.vehicles, id.as_aggregate(), "vehicle").await?;
        let orders = self.orders.find(&[Filter::eq("vehicle_id", id)]).await?;
        if !orders.is_empty() {
            return Err(ServiceError::validation(format!(
                "vehicle {} has {} service order(s) and cannot be deleted",
                vehicle.plate(),
                orders.len()
            )));
        }
        self.vehicles.delete(id.as_aggregate()).await?;

        self.audit
            .record(ctx, "vehicle.deleted", "vehicle", id.as_aggregate(), details(&vehicle))
            .await;
        Ok(())
    }

    pub async fn get_vehicle(&self, id: VehicleId) -> ServiceResult<Vehicle> {
        require(&self.vehicles, id.as_aggregate(), "vehicle").await
    }

    pub async fn find_vehicle_by_plate(&self, plate: &str) -> ServiceResult<Vehicle> {
        let plate = normalize_plate(plate);
        self.vehicles
            .find_one(&[Filter::eq("plate", &plate)])
            .await?
            .ok_or_else(|| ServiceError::not_found("vehicle"))
    }

    pub async fn list_vehicles_by_client(&self, client_id: ClientId) -> ServiceResult<Vec<Vehicle>> {
        let mut vehicles = self.vehicles.find(&[Filter::eq("client_id", client_id)]).await?;
        vehicles.sort_by(|a, b| a.plate().cmp(b.plate()));
        Ok(vehicles)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn add_maintenance(
        &self,
        ctx: &OperationContext,
        id: VehicleId,
        cmd: RecordMaintenance,
    ) -> ServiceResult<Vehicle> {
        let mut vehicle = require(&self.vehicles, id.as_aggregate(), "vehicle").await?;
        vehicle.record_maintenance(cmd, ctx.at)?;
        self.vehicles.save(&vehicle).await?;

        self.audit
            .record(
                ctx,
                "vehicle.maintenance_recorded",
                "vehicle",
                id.as_aggregate(),
                details(vehicle.maintenance_history().last()),
            )
            .await;
        Ok(vehicle)
    }

    // ----- staff ---------------------------------------------------------

    #[instrument(skip(self, cmd), fields(staff_id = %cmd.staff_id), err)]
    pub async fn create_staff(&self, ctx: &OperationContext, cmd: RegisterStaff) -> ServiceResult<StaffMember> {
        let member = StaffMember::register(cmd)?;
        self.staff.save(&member).await?;

        self.audit
            .record(ctx, "staff.created", "staff", member.id_typed().as_aggregate(), details(&member))
            .await;
        Ok(member)
    }

    #[instrument(skip(self), err)]
    pub async fn deactivate_staff(&self, ctx: &OperationContext, id: StaffId) -> ServiceResult<StaffMember> {
        let mut member = require(&self.staff, id.as_aggregate(), "staff member").await?;
        member.deactivate(ctx.at);
        self.staff.save(&member).await?;

        self.audit
            .record(ctx, "staff.deactivated", "staff", id.as_aggregate(), serde_json::Value::Null)
            .await;
        Ok(member)
    }

    pub async fn get_staff(&self, id: StaffId) -> ServiceResult<StaffMember> {
        require(&self.staff, id.as_aggregate(), "staff member").await
    }

    pub async fn list_staff(&self) -> ServiceResult<Vec<StaffMember>> {
        let mut staff = self.staff.find(&[Filter::eq("active", true)]).await?;
        staff.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(staff)
    }

    // ----- suppliers -----------------------------------------------------

    #[instrument(skip(self, cmd), fields(supplier_id = %cmd.supplier_id), err)]
    pub async fn create_supplier(
        &self,
        ctx: &OperationContext,
        cmd: RegisterSupplier,
    ) -> ServiceResult<Supplier> {
        let supplier = Supplier::register(cmd)?;
        let taken = self
            .suppliers
            .find(&[Filter::eq("tax_id", supplier.tax_id())])
            .await?;
        if !taken.is_empty() {
            return Err(ServiceError::validation(format!(
                "a supplier with tax id {} already exists",
                supplier.tax_id()
            )));
        }
        self.suppliers.save(&supplier).await?;

        tracing::info!("supplier registered");
        self.audit
            .record(
                ctx,
                "supplier.created",
                "supplier",
                supplier.id_typed().as_aggregate(),
                details(&supplier),
            )
            .await;
        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: SupplierId) -> ServiceResult<Supplier> {
        require(&self.suppliers, id.as_aggregate(), "supplier").await
    }

    /// Active suppliers, optionally narrowed by a search term, by legal name.
    pub async fn list_suppliers(&self, search: Option<&str>) -> ServiceResult<Vec<Supplier>> {
        let mut suppliers: Vec<Supplier> = self
            .suppliers
            .find(&[Filter::eq("active", true)])
            .await?
            .into_iter()
            .filter(|s| search.is_none_or(|term| s.matches(term)))
            .collect();
        suppliers.sort_by(|a, b| a.legal_name().cmp(b.legal_name()));
        Ok(suppliers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{
        client_cmd, seed_client, seed_order, seed_vehicle, supplier_cmd, test_ctx, test_services,
        vehicle_cmd,
    };
    use wrenchbook_core::DomainError;

    #[tokio::test]
    async fn tax_id_is_unique_after_normalization() {
        let services = test_services();
        let ctx = test_ctx();
        services
            .parties
            .create_client(&ctx, client_cmd("Maria", "123.456.789-00"))
            .await
            .unwrap();

        let err = services
            .parties
            .create_client(&ctx, client_cmd("Mario", "12345678900"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn vehicle_requires_existing_client() {
        let services = test_services();
        let err = services
            .parties
            .create_vehicle(&test_ctx(), vehicle_cmd(ClientId::generate(), "ABC1D23"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn plate_lookup_normalizes_input() {
        let services = test_services();
        let client = seed_client(&services).await;
        let vehicle = seed_vehicle(&services, &client, "ABC-1D23").await;

        let found = services.parties.find_vehicle_by_plate("abc1d23").await.unwrap();
        assert_eq!(found.id_typed(), vehicle.id_typed());

        let err = services
            .parties
            .create_vehicle(&test_ctx(), vehicle_cmd(client.id_typed(), "abc 1d23"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn vehicle_with_orders_cannot_be_deleted() {
        let services = test_services();
        let client = seed_client(&services).await;
        let vehicle = seed_vehicle(&services, &client, "XYZ9A87").await;
        let spare = seed_vehicle(&services, &client, "XYZ9A88").await;
        seed_order(&services, &client, &vehicle).await;

        let err = services
            .parties
            .delete_vehicle(&test_ctx(), vehicle.id_typed())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        services.parties.delete_vehicle(&test_ctx(), spare.id_typed()).await.unwrap();
        assert!(matches!(
            services.parties.get_vehicle(spare.id_typed()).await,
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn deactivated_clients_leave_the_listing() {
        let services = test_services();
        let ctx = test_ctx();
        let client = seed_client(&services).await;
        assert_eq!(services.parties.list_clients(None).await.unwrap().len(), 1);

        services.parties.deactivate_client(&ctx, client.id_typed()).await.unwrap();
        assert!(services.parties.list_clients(None).await.unwrap().is_empty());
        assert!(!services.parties.get_client(client.id_typed()).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn supplier_tax_id_is_unique_and_listing_searches() {
        let services = test_services();
        let ctx = test_ctx();
        let supplier = services
            .parties
            .create_supplier(&ctx, supplier_cmd("Filtros Sul Ltda", "11.222.333/0001-44"))
            .await
            .unwrap();
        services
            .parties
            .create_supplier(&ctx, supplier_cmd("Baterias Norte SA", "55.666.777/0001-88"))
            .await
            .unwrap();

        let err = services
            .parties
            .create_supplier(&ctx, supplier_cmd("Filtros Copia", "11222333000144"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let all = services.parties.list_suppliers(None).await.unwrap();
        let names: Vec<_> = all.iter().map(Supplier::legal_name).collect();
        assert_eq!(names, vec!["Baterias Norte SA", "Filtros Sul Ltda"]);

        let found = services.parties.list_suppliers(Some("filtros")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id_typed(), supplier.id_typed());

        let fetched = services.parties.get_supplier(supplier.id_typed()).await.unwrap();
        assert_eq!(fetched, supplier);
        assert!(matches!(
            services.parties.get_supplier(SupplierId::generate()).await,
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn mutations_leave_an_audit_trail() {
        let services = test_services();
        let client = seed_client(&services).await;

        let entries = services
            .audit
            .list(Some(client.id_typed().as_aggregate()))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "client.created");
    }
}
