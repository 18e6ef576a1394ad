pub mod calculation;
pub mod department;
pub mod employee;
pub mod kpi;
pub mod kpi_record;
pub mod notification;
pub mod role;
