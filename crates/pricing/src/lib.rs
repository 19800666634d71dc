//! Price lists with quantity tiers, and price resolution over them.

pub mod price_list;
pub mod resolve;

pub use price_list::{
    CreatePriceListRequest, PriceEntry, PriceList, PriceListId, UpdatePriceListRequest,
};
pub use resolve::{ResolvedPrice, resolve_price};
