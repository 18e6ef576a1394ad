pub mod kpi_cache;
pub mod notify;
pub mod pagination;
