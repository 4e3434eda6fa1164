//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `catalog` - Product catalog reads (cached)
//! - `cart` - Cart operations against the stored user record

pub mod cart;
pub mod catalog;

pub use cart::{CartContents, CartError, CartLine, CartService};
pub use catalog::CatalogService;
