use anyhow::{Context, Result};
use dotenvy::dotenv;
use ipnet::IpNet;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub gateway_base_url: String,
    pub gateway_secret: String,
    pub provider_base_url: String,
    pub provider_api_key: String,
    pub provider_allowed_ips: AllowedIps,
    pub trusted_proxy_depth: usize,
}

#[derive(Debug, Clone)]
pub enum AllowedIps {
    Any,
    Cidrs(Vec<IpNet>),
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present

        let provider_allowed_ips = parse_allowed_ips(
            &env::var("PROVIDER_ALLOWED_IPS").unwrap_or_else(|_| "*".to_string()),
        )?;

        let config = Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            gateway_base_url: env::var("GATEWAY_BASE_URL")?,
            gateway_secret: env::var("GATEWAY_SECRET")?,
            provider_base_url: env::var("PROVIDER_BASE_URL")?,
            provider_api_key: env::var("PROVIDER_API_KEY")?,
            provider_allowed_ips,
            trusted_proxy_depth: env::var("TRUSTED_PROXY_DEPTH")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }
        if self.gateway_secret.is_empty() {
            anyhow::bail!("GATEWAY_SECRET is empty");
        }
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }

        url::Url::parse(&self.gateway_base_url).context("GATEWAY_BASE_URL is not a valid URL")?;
        url::Url::parse(&self.provider_base_url)
            .context("PROVIDER_BASE_URL is not a valid URL")?;

        Ok(())
    }
}

fn parse_allowed_ips(raw: &str) -> Result<AllowedIps> {
    let value = raw.trim();
    if value == "*" {
        return Ok(AllowedIps::Any);
    }

    let cidrs = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse::<IpNet>)
        .collect::<Result<Vec<_>, _>>()?;

    if cidrs.is_empty() {
        anyhow::bail!("PROVIDER_ALLOWED_IPS must be '*' or a comma-separated list of CIDRs");
    }

    Ok(AllowedIps::Cidrs(cidrs))
}
