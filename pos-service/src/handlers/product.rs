//! Product catalog handlers.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateProductRequest, Product, ProductImportRow, ProductResponse};
use crate::scope::Principal;
use crate::AppState;
use pos_core::error::AppError;

/// Request to import catalog rows in bulk.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportProductsRequest {
    #[validate(length(min = 1, max = 1000))]
    #[validate(nested)]
    pub rows: Vec<ProductImportRow>,
}

/// Response after a bulk import.
#[derive(Debug, Serialize)]
pub struct ImportProductsResponse {
    pub imported: usize,
}

/// List products in the caller's tenant.
///
/// GET /products
pub async fn list_products(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = state.db.list_products(Some(&principal)).await?;
    Ok(Json(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

/// Fetch a single product in the caller's tenant.
///
/// GET /products/:product_id
pub async fn get_product(
    State(state): State<AppState>,
    principal: Principal,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = state
        .db
        .find_product_by_id(product_id, Some(&principal))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;
    Ok(Json(ProductResponse::from(product)))
}

/// Create a product in the caller's tenant.
///
/// POST /products
#[tracing::instrument(skip(state, req), fields(sku = %req.sku))]
pub async fn create_product(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    req.validate()?;

    let product = Product::new(
        None,
        req.sku,
        req.product_label,
        req.unit_price_cents,
        req.stock_qty,
    );
    let product = state.db.insert_product(product, Some(&principal)).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

/// Bulk-import catalog rows, upserting by SKU. New SKUs are inserted;
/// existing ones get their label, price, and stock replaced.
///
/// POST /products/import
#[tracing::instrument(skip(state, req), fields(rows = req.rows.len()))]
pub async fn import_products(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<ImportProductsRequest>,
) -> Result<Json<ImportProductsResponse>, AppError> {
    req.validate()?;

    let tenant_id = principal.tenant_id.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Catalog import requires a tenant-scoped caller"
        ))
    })?;

    let mut imported = 0;
    for row in &req.rows {
        state.db.upsert_product_by_sku(tenant_id, row).await?;
        imported += 1;
    }

    tracing::info!(imported, "catalog import finished");
    Ok(Json(ImportProductsResponse { imported }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_request_enforces_row_bounds() {
        let empty = ImportProductsRequest { rows: vec![] };
        assert!(empty.validate().is_err());

        let bad_row = ImportProductsRequest {
            rows: vec![ProductImportRow {
                sku: "".to_string(),
                product_label: "Espresso".to_string(),
                unit_price_cents: 300,
                stock_qty: 10,
            }],
        };
        assert!(bad_row.validate().is_err());

        let ok = ImportProductsRequest {
            rows: vec![ProductImportRow {
                sku: "ESP-001".to_string(),
                product_label: "Espresso".to_string(),
                unit_price_cents: 300,
                stock_qty: 10,
            }],
        };
        assert!(ok.validate().is_ok());
    }
}
