// Library exports for the social API and its profile client.
// Integration tests and the `social-profile` binary build on these modules.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod media;
pub mod routes;
pub mod state;
