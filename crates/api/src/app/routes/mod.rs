use axum::{Router, routing::get};

use demeter_core::Module;
use demeter_infra::TenantRegistry;

use crate::middleware::{ModuleGate, module_gate};

pub mod analytics;
pub mod chat;
pub mod costs;
pub mod health;
pub mod inventory;
pub mod locations;
pub mod packaging;
pub mod photos;
pub mod pricing;
pub mod products;
pub mod sales;
pub mod system;
pub mod users;

/// Router for all authenticated (tenant-scoped) endpoints, mounted at `/api/v1`.
pub fn router(tenants: &TenantRegistry) -> Router {
    let gated = |module: Module, routes: Router| {
        routes.route_layer(axum::middleware::from_fn_with_state(
            ModuleGate {
                module,
                tenants: tenants.clone(),
            },
            module_gate,
        ))
    };

    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", gated(Module::Products, products::router()))
        .nest("/categories", gated(Module::Products, products::category_router()))
        .nest("/stock-batches", gated(Module::Inventory, inventory::batch_router()))
        .nest("/stock-movements", gated(Module::Inventory, inventory::movement_router()))
        .nest("/sales", gated(Module::Sales, sales::router()))
        .nest("/costs", gated(Module::Costs, costs::router()))
        .nest("/users", gated(Module::Users, users::router()))
        .nest("/warehouses", gated(Module::Locations, locations::warehouse_router()))
        .nest("/bins", gated(Module::Locations, locations::bin_router()))
        .nest("/packaging", gated(Module::Packaging, packaging::router()))
        .nest("/price-lists", gated(Module::Pricing, pricing::router()))
        .nest("/prices", gated(Module::Pricing, pricing::resolve_router()))
        .nest("/analytics", gated(Module::Analytics, analytics::router()))
        .nest("/photo-sessions", gated(Module::Photos, photos::session_router()))
        .nest("/images", gated(Module::Photos, photos::image_router()))
        .nest("/chat", gated(Module::Chatbot, chat::router()))
}
