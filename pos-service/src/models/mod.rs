pub mod otp_code;
pub mod product;
pub mod role;
pub mod sale;
pub mod tenant;
pub mod user;

pub use otp_code::{OtpCode, OtpPurpose, RequestMeta};
pub use product::{CreateProductRequest, Product, ProductImportRow, ProductResponse};
pub use role::{CreateRoleRequest, Role, RoleResponse};
pub use sale::{CreateSaleRequest, DailySalesSummary, Sale, SaleLine, SaleLineRequest, SaleResponse};
pub use tenant::{CreateTenantRequest, Tenant, TenantResponse, TenantState};
pub use user::{SanitizedUser, User};
