//! Product catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::scope::TenantOwned;

/// Product entity. A NULL `tenant_id` is a global catalog template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub sku: String,
    pub product_label: String,
    pub unit_price_cents: i64,
    pub stock_qty: i32,
    pub created_utc: DateTime<Utc>,
}

impl Product {
    pub fn new(
        tenant_id: Option<Uuid>,
        sku: String,
        product_label: String,
        unit_price_cents: i64,
        stock_qty: i32,
    ) -> Self {
        Self {
            product_id: Uuid::new_v4(),
            tenant_id,
            sku,
            product_label,
            unit_price_cents,
            stock_qty,
            created_utc: Utc::now(),
        }
    }
}

impl TenantOwned for Product {
    fn tenant_id_mut(&mut self) -> &mut Option<Uuid> {
        &mut self.tenant_id
    }
}

/// Request to create a product.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 128))]
    pub product_label: String,
    #[validate(range(min = 0))]
    pub unit_price_cents: i64,
    #[serde(default)]
    pub stock_qty: i32,
}

/// One row of a catalog import. Spreadsheet parsing happens upstream;
/// the service receives already-structured rows and upserts by SKU.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProductImportRow {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 128))]
    pub product_label: String,
    #[validate(range(min = 0))]
    pub unit_price_cents: i64,
    #[serde(default)]
    pub stock_qty: i32,
}

/// Product response for API.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub sku: String,
    pub product_label: String,
    pub unit_price_cents: i64,
    pub stock_qty: i32,
    pub created_utc: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.product_id,
            tenant_id: p.tenant_id,
            sku: p.sku,
            product_label: p.product_label,
            unit_price_cents: p.unit_price_cents,
            stock_qty: p.stock_qty,
            created_utc: p.created_utc,
        }
    }
}
