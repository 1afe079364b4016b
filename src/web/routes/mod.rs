pub mod check_routes;
pub mod cron_routes;
pub mod site_routes;
