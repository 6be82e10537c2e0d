//! PostgreSQL data-access layer.
//!
//! Every read of tenant-owned rows takes an `Option<&Principal>` and is
//! routed through the predicate helpers in `scope`; every insert of a
//! tenant-owned entity runs the before-create stamp hook first.

use pos_core::error::AppError;
use sqlx::postgres::PgPool;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::models::{
    DailySalesSummary, OtpCode, OtpPurpose, Product, ProductImportRow, Role, Sale, SaleLine,
    Tenant, User,
};
use crate::scope::{self, Principal};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    // ==================== Tenant Operations ====================

    /// Find tenant by ID.
    pub async fn find_tenant_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find tenant by slug.
    pub async fn find_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE tenant_slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== User Operations ====================

    /// Find user by ID.
    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find user by email (the OTP identifier).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new user, stamping the tenant id from the principal.
    pub async fn insert_user(
        &self,
        mut user: User,
        principal: Option<&Principal>,
    ) -> Result<User, AppError> {
        scope::stamp_on_create(&mut user, principal);
        sqlx::query(
            r#"
            INSERT INTO users (user_id, tenant_id, email, password_hash, display_name, email_verified, user_state_code, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.user_id)
        .bind(user.tenant_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.email_verified)
        .bind(&user.user_state_code)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(user)
    }

    /// Mark a user's email as verified.
    pub async fn mark_email_verified(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET email_verified = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Replace a user's password hash.
    pub async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Role Operations ====================

    /// Insert a new role, stamping the tenant id from the principal.
    pub async fn insert_role(
        &self,
        mut role: Role,
        principal: Option<&Principal>,
    ) -> Result<Role, AppError> {
        scope::stamp_on_create(&mut role, principal);
        sqlx::query(
            r#"
            INSERT INTO roles (role_id, tenant_id, scope_code, role_label, permissions, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.role_id)
        .bind(role.tenant_id)
        .bind(&role.scope_code)
        .bind(&role.role_label)
        .bind(&role.permissions)
        .bind(role.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(role)
    }

    /// List roles visible to the principal.
    pub async fn list_roles(&self, principal: Option<&Principal>) -> Result<Vec<Role>, AppError> {
        let mut builder = QueryBuilder::new("SELECT * FROM roles WHERE 1=1");
        scope::push_read_filter(&mut builder, principal);
        builder.push(" ORDER BY created_utc DESC");
        builder
            .build_query_as::<Role>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find a role by ID if visible to the principal.
    pub async fn find_role_by_id(
        &self,
        role_id: Uuid,
        principal: Option<&Principal>,
    ) -> Result<Option<Role>, AppError> {
        let mut builder = QueryBuilder::new("SELECT * FROM roles WHERE role_id = ");
        builder.push_bind(role_id);
        scope::push_read_filter(&mut builder, principal);
        builder
            .build_query_as::<Role>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Delete a role. Tenant principals may only delete rows owned by
    /// their tenant (templates stay). Returns whether a row was removed.
    pub async fn delete_role(
        &self,
        role_id: Uuid,
        principal: Option<&Principal>,
    ) -> Result<bool, AppError> {
        let mut builder = QueryBuilder::new("DELETE FROM roles WHERE role_id = ");
        builder.push_bind(role_id);
        if let Some(principal) = principal {
            if let Some(tenant_id) = principal.tenant_id {
                builder.push(" AND tenant_id = ");
                builder.push_bind(tenant_id);
            }
        }
        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    /// List template roles (tenant_id IS NULL).
    pub async fn list_template_roles(&self) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE tenant_id IS NULL AND scope_code = 'tenant' ORDER BY created_utc",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== Product Operations ====================

    /// Insert a new product, stamping the tenant id from the principal.
    pub async fn insert_product(
        &self,
        mut product: Product,
        principal: Option<&Principal>,
    ) -> Result<Product, AppError> {
        scope::stamp_on_create(&mut product, principal);
        sqlx::query(
            r#"
            INSERT INTO products (product_id, tenant_id, sku, product_label, unit_price_cents, stock_qty, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.product_id)
        .bind(product.tenant_id)
        .bind(&product.sku)
        .bind(&product.product_label)
        .bind(product.unit_price_cents)
        .bind(product.stock_qty)
        .bind(product.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(product)
    }

    /// List products visible to the principal.
    pub async fn list_products(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Vec<Product>, AppError> {
        let mut builder = QueryBuilder::new("SELECT * FROM products WHERE 1=1");
        scope::push_tenant_filter(&mut builder, principal);
        builder.push(" ORDER BY sku");
        builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find a product by ID if visible to the principal.
    pub async fn find_product_by_id(
        &self,
        product_id: Uuid,
        principal: Option<&Principal>,
    ) -> Result<Option<Product>, AppError> {
        let mut builder = QueryBuilder::new("SELECT * FROM products WHERE product_id = ");
        builder.push_bind(product_id);
        scope::push_tenant_filter(&mut builder, principal);
        builder
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Upsert one import row by (tenant_id, sku).
    pub async fn upsert_product_by_sku(
        &self,
        tenant_id: Uuid,
        row: &ProductImportRow,
    ) -> Result<Product, AppError> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (product_id, tenant_id, sku, product_label, unit_price_cents, stock_qty, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (tenant_id, sku) DO UPDATE
            SET product_label = EXCLUDED.product_label,
                unit_price_cents = EXCLUDED.unit_price_cents,
                stock_qty = EXCLUDED.stock_qty
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(&row.sku)
        .bind(&row.product_label)
        .bind(row.unit_price_cents)
        .bind(row.stock_qty)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== Sale Operations ====================

    /// Next receipt number from the database sequence.
    pub async fn next_receipt_no(&self) -> Result<String, AppError> {
        let (n,): (i64,) = sqlx::query_as("SELECT nextval('receipt_no_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(format!("R{:08}", n))
    }

    /// Insert a sale with its lines in one transaction.
    pub async fn insert_sale_with_lines(
        &self,
        mut sale: Sale,
        lines: Vec<SaleLine>,
        principal: Option<&Principal>,
    ) -> Result<(Sale, Vec<SaleLine>), AppError> {
        scope::stamp_on_create(&mut sale, principal);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        sqlx::query(
            r#"
            INSERT INTO sales (sale_id, tenant_id, receipt_no, cashier_user_id, total_cents, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(sale.sale_id)
        .bind(sale.tenant_id)
        .bind(&sale.receipt_no)
        .bind(sale.cashier_user_id)
        .bind(sale.total_cents)
        .bind(sale.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO sale_lines (line_id, sale_id, product_id, qty, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(line.line_id)
            .bind(line.sale_id)
            .bind(line.product_id)
            .bind(line.qty)
            .bind(line.unit_price_cents)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok((sale, lines))
    }

    /// List sales visible to the principal, newest first.
    pub async fn list_sales(&self, principal: Option<&Principal>) -> Result<Vec<Sale>, AppError> {
        let mut builder = QueryBuilder::new("SELECT * FROM sales WHERE 1=1");
        scope::push_tenant_filter(&mut builder, principal);
        builder.push(" ORDER BY created_utc DESC");
        builder
            .build_query_as::<Sale>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Find a sale by ID if visible to the principal.
    pub async fn find_sale_by_id(
        &self,
        sale_id: Uuid,
        principal: Option<&Principal>,
    ) -> Result<Option<Sale>, AppError> {
        let mut builder = QueryBuilder::new("SELECT * FROM sales WHERE sale_id = ");
        builder.push_bind(sale_id);
        scope::push_tenant_filter(&mut builder, principal);
        builder
            .build_query_as::<Sale>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Lines belonging to a sale.
    pub async fn find_sale_lines(&self, sale_id: Uuid) -> Result<Vec<SaleLine>, AppError> {
        sqlx::query_as::<_, SaleLine>("SELECT * FROM sale_lines WHERE sale_id = $1")
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Per-day sale count and revenue, visible to the principal.
    pub async fn daily_sales_summary(
        &self,
        principal: Option<&Principal>,
    ) -> Result<Vec<DailySalesSummary>, AppError> {
        let mut builder = QueryBuilder::new(
            "SELECT created_utc::date AS sale_day, COUNT(*) AS sale_count, \
             COALESCE(SUM(total_cents), 0)::bigint AS total_cents FROM sales WHERE 1=1",
        );
        scope::push_tenant_filter(&mut builder, principal);
        builder.push(" GROUP BY sale_day ORDER BY sale_day DESC");
        builder
            .build_query_as::<DailySalesSummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== OTP Operations ====================

    /// Insert a new OTP record.
    pub async fn insert_otp_code(&self, otp: &OtpCode) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO otp_codes (otp_id, identifier, purpose_code, code_salt, code_hash,
                                   expiry_utc, created_utc, confirmed_utc, attempt_count,
                                   ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(otp.otp_id)
        .bind(&otp.identifier)
        .bind(&otp.purpose_code)
        .bind(&otp.code_salt)
        .bind(&otp.code_hash)
        .bind(otp.expiry_utc)
        .bind(otp.created_utc)
        .bind(otp.confirmed_utc)
        .bind(otp.attempt_count)
        .bind(&otp.ip_address)
        .bind(&otp.user_agent)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Most recently created unconfirmed, unexpired record for the
    /// identifier+purpose pair. Expiry is evaluated at query time.
    pub async fn find_latest_active_otp(
        &self,
        identifier: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpCode>, AppError> {
        sqlx::query_as::<_, OtpCode>(
            r#"
            SELECT * FROM otp_codes
            WHERE identifier = $1 AND purpose_code = $2
              AND confirmed_utc IS NULL AND expiry_utc > now()
            ORDER BY created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Conditionally increment the attempt counter. Returns false when
    /// the record was already at the cap (or gone), so two concurrent
    /// wrong guesses cannot both pass the limit.
    pub async fn increment_otp_attempts_below(
        &self,
        otp_id: Uuid,
        max_attempts: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE otp_codes SET attempt_count = attempt_count + 1 \
             WHERE otp_id = $1 AND attempt_count < $2",
        )
        .bind(otp_id)
        .bind(max_attempts)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark a record as confirmed.
    pub async fn confirm_otp(&self, otp_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE otp_codes SET confirmed_utc = now() WHERE otp_id = $1")
            .bind(otp_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Delete a record outright (attempt exhaustion).
    pub async fn delete_otp(&self, otp_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM otp_codes WHERE otp_id = $1")
            .bind(otp_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Count codes issued for an identifier+purpose inside a window,
    /// used to throttle issuance.
    pub async fn count_recent_otps(
        &self,
        identifier: &str,
        purpose: OtpPurpose,
        window_seconds: i64,
    ) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM otp_codes \
             WHERE identifier = $1 AND purpose_code = $2 \
               AND created_utc > now() - make_interval(secs => $3)",
        )
        .bind(identifier)
        .bind(purpose.as_str())
        .bind(window_seconds as f64)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(count)
    }
}
