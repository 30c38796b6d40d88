pub mod service;

pub use service::{CollectionReport, StatisticsService};
