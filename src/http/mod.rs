//! HTTP surface: routes and error responses

pub mod routes;

pub use routes::build_router;
