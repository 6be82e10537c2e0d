//! Sale recording and reporting handlers.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateSaleRequest, DailySalesSummary, Sale, SaleLine, SaleResponse};
use crate::scope::Principal;
use crate::AppState;
use pos_core::error::AppError;

/// Record a sale. Unit prices come from the catalog at recording time,
/// not from the request, so a stale client cannot set its own prices.
///
/// POST /sales
#[tracing::instrument(skip(state, req), fields(lines = req.lines.len()))]
pub async fn create_sale(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    req.validate()?;

    if principal.is_system() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Sales are recorded by tenant-scoped users"
        )));
    }

    let sale_id = Uuid::new_v4();
    let mut total_cents: i64 = 0;
    let mut lines = Vec::with_capacity(req.lines.len());
    for line in &req.lines {
        let product = state
            .db
            .find_product_by_id(line.product_id, Some(&principal))
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Product not found")))?;

        total_cents += product.unit_price_cents * i64::from(line.qty);
        lines.push(SaleLine {
            line_id: Uuid::new_v4(),
            sale_id,
            product_id: product.product_id,
            qty: line.qty,
            unit_price_cents: product.unit_price_cents,
        });
    }

    let receipt_no = state.db.next_receipt_no().await?;
    let mut sale = Sale::new(None, receipt_no, principal.user_id, total_cents);
    sale.sale_id = sale_id;

    let (sale, lines) = state
        .db
        .insert_sale_with_lines(sale, lines, Some(&principal))
        .await?;

    tracing::info!(sale_id = %sale.sale_id, receipt_no = %sale.receipt_no, "sale recorded");
    Ok((
        StatusCode::CREATED,
        Json(SaleResponse::from_parts(sale, lines)),
    ))
}

/// List sales visible to the caller, newest first.
///
/// GET /sales
pub async fn list_sales(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Sale>>, AppError> {
    let sales = state.db.list_sales(Some(&principal)).await?;
    Ok(Json(sales))
}

/// Fetch a sale with its lines.
///
/// GET /sales/:sale_id
pub async fn get_sale(
    State(state): State<AppState>,
    principal: Principal,
    Path(sale_id): Path<Uuid>,
) -> Result<Json<SaleResponse>, AppError> {
    let sale = state
        .db
        .find_sale_by_id(sale_id, Some(&principal))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Sale not found")))?;

    let lines = state.db.find_sale_lines(sale.sale_id).await?;
    Ok(Json(SaleResponse::from_parts(sale, lines)))
}

/// Daily sales report: per-day count and revenue for the caller's tenant.
///
/// GET /reports/sales/daily
pub async fn daily_sales_report(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<DailySalesSummary>>, AppError> {
    let summary = state.db.daily_sales_summary(Some(&principal)).await?;
    Ok(Json(summary))
}
