//! Products domain module.
//!
//! This crate contains business rules for the product catalog, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage).

pub mod category;
pub mod product;

pub use category::{Category, CategoryId, CreateCategoryRequest, UpdateCategoryRequest, would_create_cycle};
pub use product::{
    CreateProductRequest, Product, ProductId, ProductState, UpdateProductRequest,
};
