use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate health of a monitored site, derived from its latest probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "site_status_enum")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    #[default]
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
    #[sea_orm(string_value = "MAINTENANCE")]
    Maintenance,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SiteStatus::Active => "ACTIVE",
            SiteStatus::Inactive => "INACTIVE",
            SiteStatus::Maintenance => "MAINTENANCE",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "check_type_enum")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckType {
    #[sea_orm(string_value = "HTTP")]
    Http,
    #[sea_orm(string_value = "HTTPS")]
    Https,
    #[sea_orm(string_value = "PING")]
    Ping,
    #[sea_orm(string_value = "TCP")]
    Tcp,
    #[sea_orm(string_value = "DNS")]
    Dns,
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            CheckType::Http => "HTTP",
            CheckType::Https => "HTTPS",
            CheckType::Ping => "PING",
            CheckType::Tcp => "TCP",
            CheckType::Dns => "DNS",
        };
        f.write_str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_serialize_as_upper_case() {
        assert_eq!(serde_json::to_string(&SiteStatus::Maintenance).unwrap(), "\"MAINTENANCE\"");
        assert_eq!(SiteStatus::Inactive.to_string(), "INACTIVE");
        let parsed: CheckType = serde_json::from_str("\"HTTPS\"").unwrap();
        assert_eq!(parsed, CheckType::Https);
    }

    #[test]
    fn new_sites_default_to_active() {
        assert_eq!(SiteStatus::default(), SiteStatus::Active);
    }
}
