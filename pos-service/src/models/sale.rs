//! Sale and receipt models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::scope::TenantOwned;

/// Sale header entity. `receipt_no` comes from a database sequence.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sale {
    pub sale_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub receipt_no: String,
    pub cashier_user_id: Uuid,
    pub total_cents: i64,
    pub created_utc: DateTime<Utc>,
}

impl Sale {
    pub fn new(
        tenant_id: Option<Uuid>,
        receipt_no: String,
        cashier_user_id: Uuid,
        total_cents: i64,
    ) -> Self {
        Self {
            sale_id: Uuid::new_v4(),
            tenant_id,
            receipt_no,
            cashier_user_id,
            total_cents,
            created_utc: Utc::now(),
        }
    }
}

impl TenantOwned for Sale {
    fn tenant_id_mut(&mut self) -> &mut Option<Uuid> {
        &mut self.tenant_id
    }
}

/// One line of a sale.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SaleLine {
    pub line_id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub qty: i32,
    pub unit_price_cents: i64,
}

/// Request line: price is resolved from the catalog at recording time.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SaleLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub qty: i32,
}

/// Request to record a sale.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSaleRequest {
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub lines: Vec<SaleLineRequest>,
}

/// Sale response with lines.
#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub sale_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub receipt_no: String,
    pub cashier_user_id: Uuid,
    pub total_cents: i64,
    pub created_utc: DateTime<Utc>,
    pub lines: Vec<SaleLine>,
}

impl SaleResponse {
    pub fn from_parts(sale: Sale, lines: Vec<SaleLine>) -> Self {
        Self {
            sale_id: sale.sale_id,
            tenant_id: sale.tenant_id,
            receipt_no: sale.receipt_no,
            cashier_user_id: sale.cashier_user_id,
            total_cents: sale.total_cents,
            created_utc: sale.created_utc,
            lines,
        }
    }
}

/// One row of the daily sales report.
#[derive(Debug, Serialize, FromRow)]
pub struct DailySalesSummary {
    pub sale_day: NaiveDate,
    pub sale_count: i64,
    pub total_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_request_rejects_empty_and_zero_qty_lines() {
        let empty = CreateSaleRequest { lines: vec![] };
        assert!(empty.validate().is_err());

        let zero_qty = CreateSaleRequest {
            lines: vec![SaleLineRequest {
                product_id: Uuid::new_v4(),
                qty: 0,
            }],
        };
        assert!(zero_qty.validate().is_err());

        let ok = CreateSaleRequest {
            lines: vec![SaleLineRequest {
                product_id: Uuid::new_v4(),
                qty: 2,
            }],
        };
        assert!(ok.validate().is_ok());
    }
}
