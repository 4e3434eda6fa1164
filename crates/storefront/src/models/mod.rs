//! Domain models for storefront.
//!
//! Wire-format types for the two document collections (`users`, `products`)
//! plus the session-stored identity. The document store is schemaless, so
//! these types pin down the field names and shapes this application relies on.

pub mod product;
pub mod session;
pub mod user;

pub use product::Product;
pub use session::CurrentUser;
pub use session::keys as session_keys;
pub use user::UserRecord;

/// Document collections this application reads and writes.
pub mod collections {
    /// Per-user records keyed by user ID.
    pub const USERS: &str = "users";

    /// Read-only product catalog keyed by product ID.
    pub const PRODUCTS: &str = "products";
}
