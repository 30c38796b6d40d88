pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod devices;
pub mod energy;
pub mod statistics;
pub mod store;
