use serde::{Deserialize, Serialize};

use crate::db::entities::{check, site};
use crate::db::enums::CheckType;

#[derive(Debug, Clone, Serialize)]
pub struct SiteWithChecks {
    #[serde(flatten)]
    pub site: site::Model,
    pub checks: Vec<check::Model>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSite {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    /// Optionally create the first check together with the site.
    pub check: Option<NewSiteCheck>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSiteCheck {
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub interval: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSite {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedSite {
    #[serde(flatten)]
    pub site: site::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<check::Model>,
}

impl CreateSite {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_site_url(&self.url)?;
        if let Some(check) = &self.check {
            super::check_models::validate_interval(check.interval)?;
        }
        Ok(())
    }
}

impl UpdateSite {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(url) = &self.url {
            validate_site_url(url)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Site name must not be empty".to_string());
    }
    Ok(())
}

/// Sites are probed over HTTP(S), so only absolute http/https URLs are accepted.
pub fn validate_site_url(url: &str) -> Result<(), String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| format!("Invalid site URL '{url}': {e}"))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        _ => Err(format!("Site URL must be an http(s) URL with a host: {url}")),
    }
}
