pub mod check_result_service;
pub mod check_service;
pub mod check_store;
pub mod site_service;

pub use check_store::{CheckRun, CheckStore, CheckWithSite, SeaOrmCheckStore, StoreError};
