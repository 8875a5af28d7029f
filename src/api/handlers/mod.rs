//! One module per resource group, mirroring the route table in
//! `api::build_router`.

pub mod alerts;
pub mod dashboard;
pub mod executions;
pub mod health;
pub mod jobs;
pub mod logs;
pub mod maintenance;
pub mod servers;
