pub mod agent;
pub mod alert;
pub mod network_check;
pub mod system_metric;
