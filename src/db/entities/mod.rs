//! SeaORM entities for the monitoring schema.

pub mod check;
pub mod check_result;
pub mod site;
pub mod user;

pub mod prelude {
    pub use super::check::Entity as Check;
    pub use super::check_result::Entity as CheckResult;
    pub use super::site::Entity as Site;
}
