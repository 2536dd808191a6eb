// Application layer - Use cases and ports
pub mod annotation_service;
pub mod reconciler;
pub mod region_store;
pub mod series_cache;
pub mod series_fetcher;
pub mod series_source;
