pub mod api;
pub mod fetcher;
