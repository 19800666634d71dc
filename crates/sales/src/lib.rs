//! Sales domain module.
//!
//! A sale is created `PENDING`, then either completed (stock is drawn) or
//! cancelled. Stock allocation itself lives in `demeter-inventory`; this crate
//! only owns the sale document and its lifecycle.

pub mod sale;

pub use sale::{
    CreateSaleItemRequest, CreateSaleRequest, Sale, SaleId, SaleItem, SaleItemId, SaleStatus,
    sale_number,
};
