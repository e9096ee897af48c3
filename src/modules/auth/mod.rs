pub mod controller;
pub mod interface;
pub mod manager;
pub mod model;
pub mod routes;
pub mod schema;
pub mod store;

pub use routes::auth_routes;
