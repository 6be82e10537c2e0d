//! Row-level tenant isolation.
//!
//! Every read against tenant-owned tables goes through the predicate
//! helpers here, and every insert goes through the before-create stamp.
//! The helpers are pure: they never touch storage and never error.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// Scope discriminator value carried by role-like rows.
pub const SCOPE_TENANT: &str = "tenant";

/// The authenticated actor making a request.
///
/// A `tenant_id` of `None` denotes a system-level principal with
/// cross-tenant visibility. Constructed once per request from validated
/// token claims and threaded explicitly into data-access calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
}

impl Principal {
    /// A principal bound to a single tenant.
    pub fn tenant(user_id: Uuid, tenant_id: Uuid) -> Self {
        Self {
            user_id,
            tenant_id: Some(tenant_id),
        }
    }

    /// A system-level principal (unfiltered reads).
    pub fn system(user_id: Uuid) -> Self {
        Self {
            user_id,
            tenant_id: None,
        }
    }

    pub fn is_system(&self) -> bool {
        self.tenant_id.is_none()
    }
}

/// Append the tenant read predicate for scoped (role-like) tables.
///
/// No principal, or a system principal: no predicate is appended. A
/// tenant principal is restricted to rows with `scope_code = 'tenant'`
/// that belong to its tenant or are templates (`tenant_id IS NULL`).
///
/// The "is there a principal at all" check short-circuits before any
/// principal field is read, so this can run while the principal row
/// itself is being loaded.
pub fn push_read_filter(builder: &mut QueryBuilder<'_, Postgres>, principal: Option<&Principal>) {
    let Some(principal) = principal else {
        return;
    };
    let Some(tenant_id) = principal.tenant_id else {
        return;
    };

    builder.push(" AND scope_code = ");
    builder.push_bind(SCOPE_TENANT);
    builder.push(" AND (tenant_id = ");
    builder.push_bind(tenant_id);
    builder.push(" OR tenant_id IS NULL)");
}

/// Append the tenant read predicate for tables without a scope
/// discriminator (products, sales). Same visibility rule minus the
/// `scope_code` conjunct.
pub fn push_tenant_filter(builder: &mut QueryBuilder<'_, Postgres>, principal: Option<&Principal>) {
    let Some(principal) = principal else {
        return;
    };
    let Some(tenant_id) = principal.tenant_id else {
        return;
    };

    builder.push(" AND (tenant_id = ");
    builder.push_bind(tenant_id);
    builder.push(" OR tenant_id IS NULL)");
}

/// An entity carrying a nullable tenant identifier.
pub trait TenantOwned {
    fn tenant_id_mut(&mut self) -> &mut Option<Uuid>;
}

/// Before-create hook invoked by the storage layer's insert pipeline.
///
/// A tenant principal force-overwrites any caller-supplied tenant id,
/// preventing cross-tenant injection. A system principal (or an
/// unauthenticated context) leaves the entity untouched.
pub fn stamp_on_create<T: TenantOwned>(entity: &mut T, principal: Option<&Principal>) {
    let Some(principal) = principal else {
        return;
    };
    if let Some(tenant_id) = principal.tenant_id {
        *entity.tenant_id_mut() = Some(tenant_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        tenant_id: Option<Uuid>,
    }

    impl TenantOwned for Row {
        fn tenant_id_mut(&mut self) -> &mut Option<Uuid> {
            &mut self.tenant_id
        }
    }

    #[test]
    fn read_filter_no_principal_appends_nothing() {
        let mut builder = QueryBuilder::new("SELECT * FROM roles WHERE 1=1");
        push_read_filter(&mut builder, None);
        assert_eq!(builder.sql(), "SELECT * FROM roles WHERE 1=1");
    }

    #[test]
    fn read_filter_system_principal_appends_nothing() {
        let principal = Principal::system(Uuid::new_v4());
        let mut builder = QueryBuilder::new("SELECT * FROM roles WHERE 1=1");
        push_read_filter(&mut builder, Some(&principal));
        assert_eq!(builder.sql(), "SELECT * FROM roles WHERE 1=1");
    }

    #[test]
    fn read_filter_tenant_principal_restricts_scope_and_tenant() {
        let principal = Principal::tenant(Uuid::new_v4(), Uuid::new_v4());
        let mut builder = QueryBuilder::new("SELECT * FROM roles WHERE 1=1");
        push_read_filter(&mut builder, Some(&principal));

        let sql = builder.sql();
        assert!(sql.contains("scope_code = $1"));
        assert!(sql.contains("(tenant_id = $2 OR tenant_id IS NULL)"));
    }

    #[test]
    fn tenant_filter_omits_scope_conjunct() {
        let principal = Principal::tenant(Uuid::new_v4(), Uuid::new_v4());
        let mut builder = QueryBuilder::new("SELECT * FROM products WHERE 1=1");
        push_tenant_filter(&mut builder, Some(&principal));

        let sql = builder.sql();
        assert!(!sql.contains("scope_code"));
        assert!(sql.contains("(tenant_id = $1 OR tenant_id IS NULL)"));
    }

    #[test]
    fn stamp_overrides_caller_supplied_tenant() {
        let tenant_id = Uuid::new_v4();
        let principal = Principal::tenant(Uuid::new_v4(), tenant_id);
        let mut row = Row {
            tenant_id: Some(Uuid::new_v4()),
        };

        stamp_on_create(&mut row, Some(&principal));
        assert_eq!(row.tenant_id, Some(tenant_id));
    }

    #[test]
    fn stamp_system_principal_leaves_entity_untouched() {
        let other = Uuid::new_v4();
        let principal = Principal::system(Uuid::new_v4());
        let mut row = Row {
            tenant_id: Some(other),
        };

        stamp_on_create(&mut row, Some(&principal));
        assert_eq!(row.tenant_id, Some(other));

        let mut empty = Row { tenant_id: None };
        stamp_on_create(&mut empty, Some(&principal));
        assert_eq!(empty.tenant_id, None);
    }

    #[test]
    fn stamp_without_principal_is_a_noop() {
        let mut row = Row { tenant_id: None };
        stamp_on_create(&mut row, None);
        assert_eq!(row.tenant_id, None);
    }
}
