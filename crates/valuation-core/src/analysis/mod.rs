pub mod kpi;
pub mod report;
