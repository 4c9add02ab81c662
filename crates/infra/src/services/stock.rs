use std::sync::Arc;

use tracing::instrument;

use wrenchbook_inventory::{
    MoveStock, MovementDirection, Product, ProductId, RegisterProduct, StockMovement,
    StockMovementId, UpdateProduct,
};
use wrenchbook_parties::{Supplier, SupplierId};

use crate::audit::AuditTrail;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{DocumentStore, Filter, Repository};

use super::{OperationContext, details, require};

/// Products and the single write path for their on-hand quantity.
#[derive(Clone)]
pub struct StockKeeper {
    products: Repository<Product>,
    movements: Repository<StockMovement>,
    suppliers: Repository<Supplier>,
    audit: AuditTrail,
}

impl StockKeeper {
    pub fn new(store: Arc<dyn DocumentStore>, audit: AuditTrail) -> Self {
        Self {
            products: Repository::new(store.clone()),
            movements: Repository::new(store.clone()),
            suppliers: Repository::new(store),
            audit,
        }
    }

    pub(crate) async fn load(&self, id: ProductId) -> ServiceResult<Product> {
        require(&self.products, id.as_aggregate(), "product").await
    }

    /// Apply a movement and persist it: product first, then the movement.
    ///
    /// The two writes are independent; a failure on the second leaves the
    /// product already changed.
    pub(crate) async fn commit_movement(
        &self,
        product: &mut Product,
        cmd: MoveStock,
    ) -> ServiceResult<StockMovement> {
        let movement = product.move_stock(cmd)?;
        self.products.save(product).await?;
        self.movements.save(&movement).await?;
        Ok(movement)
    }

    async fn ensure_code_free(&self, code: &str, owner: Option<ProductId>) -> ServiceResult<()> {
        let taken = self.products.find(&[Filter::eq("code", code)]).await?;
        if taken.iter().any(|p| Some(p.id_typed()) != owner) {
            return Err(ServiceError::validation(format!(
                "product code {code} is already in use"
            )));
        }
        Ok(())
    }

    async fn require_supplier(&self, id: Option<SupplierId>) -> ServiceResult<()> {
        if let Some(id) = id {
            require(&self.suppliers, id.as_aggregate(), "supplier").await?;
        }
        Ok(())
    }

    #[instrument(skip(self, cmd), fields(product_id = %cmd.product_id), err)]
    pub async fn create_product(&self, ctx: &OperationContext, cmd: RegisterProduct) -> ServiceResult<Product> {
        self.require_supplier(cmd.supplier_id).await?;
        let product = Product::register(cmd)?;
        self.ensure_code_free(product.code(), None).await?;
        self.products.save(&product).await?;

        tracing::info!(code = product.code(), "product registered");
        self.audit
            .record(ctx, "product.created", "product", product.id_typed().as_aggregate(), details(&product))
            .await;
        Ok(product)
    }

    #[instrument(skip(self, cmd), err)]
    pub async fn update_product(
        &self,
        ctx: &OperationContext,
        id: ProductId,
        cmd: UpdateProduct,
    ) -> ServiceResult<Product> {
        let mut product = self.load(id).await?;
        self.require_supplier(cmd.supplier_id).await?;
        product.update(cmd, ctx.at)?;
        self.ensure_code_free(product.code(), Some(id)).await?;
        self.products.save(&product).await?;

        self.audit
            .record(ctx, "product.updated", "product", id.as_aggregate(), details(&product))
            .await;
        Ok(product)
    }

    #[instrument(skip(self), err)]
    pub async fn deactivate_product(&self, ctx: &OperationContext, id: ProductId) -> ServiceResult<Product> {
        let mut product = self.load(id).await?;
        product.deactivate(ctx.at);
        self.products.save(&product).await?;

        self.audit
            .record(ctx, "product.deactivated", "product", id.as_aggregate(), serde_json::Value::Null)
            .await;
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.load(id).await
    }

    /// Active products matching name, code or barcode, by name.
    pub async fn search_products(&self, search: Option<&str>) -> ServiceResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .find(&[Filter::eq("active", true)])
            .await?
            .into_iter()
            .filter(|p| search.is_none_or(|term| p.matches(term)))
            .collect();
        products.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(products)
    }

    /// Active products bought from `supplier_id`, by name.
    pub async fn products_by_supplier(&self, supplier_id: SupplierId) -> ServiceResult<Vec<Product>> {
        require(&self.suppliers, supplier_id.as_aggregate(), "supplier").await?;
        let mut products = self
            .products
            .find(&[Filter::eq("active", true), Filter::eq("supplier_id", supplier_id)])
            .await?;
        products.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(products)
    }

    /// Active products at or below their minimum stock.
    pub async fn low_stock(&self) -> ServiceResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .find(&[Filter::eq("active", true)])
            .await?
            .into_iter()
            .filter(Product::is_low_stock)
            .collect();
        products.sort_by_key(|p| p.stock_quantity());
        Ok(products)
    }

    /// Manual stock entry or withdrawal.
    #[instrument(skip(self, reason), err)]
    pub async fn move_stock(
        &self,
        ctx: &OperationContext,
        id: ProductId,
        direction: MovementDirection,
        quantity: u32,
        reason: &str,
    ) -> ServiceResult<(Product, StockMovement)> {
        let mut product = self.load(id).await?;
        let movement = self
            .commit_movement(
                &mut product,
                MoveStock {
                    movement_id: StockMovementId::generate(),
                    direction,
                    quantity,
                    reason: reason.to_string(),
                    order: None,
                    actor: ctx.actor,
                    occurred_at: ctx.at,
                },
            )
            .await?;

        tracing::info!(
            balance = movement.balance_after(),
            "stock moved"
        );
        self.audit
            .record(ctx, "product.stock_moved", "product", id.as_aggregate(), details(&movement))
            .await;
        Ok((product, movement))
    }

    /// Movement history of a product, most recent first.
    pub async fn movements(&self, id: ProductId) -> ServiceResult<Vec<StockMovement>> {
        self.load(id).await?;
        let mut movements = self.movements.find(&[Filter::eq("product_id", id)]).await?;
        movements.sort_by(|a, b| {
            b.occurred_at()
                .cmp(&a.occurred_at())
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });
        Ok(movements)
    }
}
