use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub beacon: BeaconConfig,
    pub authority: AuthorityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeaconConfig {
    /// Service identifier broadcast alongside the payload and used as the
    /// scan filter.
    pub service_uuid: String,
    /// Usable payload bytes per advertisement frame. The default assumes a
    /// 31-byte legacy frame carrying a 16-bit-UUID service-data field:
    /// 31 - 1 (length) - 1 (type) - 2 (uuid) = 27.
    pub payload_budget: usize,
    /// Scan sessions auto-stop after this many seconds.
    pub scan_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    /// Issuer prefix every transfer code starts with.
    pub issuer_code: String,
    /// Human-readable issuer name returned to validators.
    pub issuer_name: String,
    /// Codes expire this many minutes after issuance.
    pub code_ttl_minutes: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            beacon: BeaconConfig {
                service_uuid: env::var("BEACON_SERVICE_UUID")
                    .unwrap_or_else(|_| "0000180F-0000-1000-8000-00805F9B34FB".to_string()),
                payload_budget: env::var("BEACON_PAYLOAD_BUDGET")
                    .unwrap_or_else(|_| "27".to_string())
                    .parse()?,
                scan_timeout_secs: env::var("BEACON_SCAN_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            authority: AuthorityConfig {
                issuer_code: env::var("AUTHORITY_ISSUER_CODE")
                    .unwrap_or_else(|_| "088".to_string()),
                issuer_name: env::var("AUTHORITY_ISSUER_NAME")
                    .unwrap_or_else(|_| "Shinhan Bank".to_string()),
                code_ttl_minutes: env::var("AUTHORITY_CODE_TTL_MINUTES")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
        })
    }
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            service_uuid: "0000180F-0000-1000-8000-00805F9B34FB".to_string(),
            payload_budget: 27,
            scan_timeout_secs: 30,
        }
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            issuer_code: "088".to_string(),
            issuer_name: "Shinhan Bank".to_string(),
            code_ttl_minutes: 10,
        }
    }
}
