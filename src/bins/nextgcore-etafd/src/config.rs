//! ETAF Configuration
//!
//! Static configuration snapshot held by the context registry, and the YAML
//! loader that fills it from the `etaf:` section of the configuration file.

use std::path::Path;

use serde_yaml::Value;

use crate::error::ConfigError;
use crate::models::{Guami, PlmnId, Snssai, Tai, UriScheme};
use crate::security::{
    parse_ciphering_algorithm, parse_integrity_algorithm, ALG_CIPHERING_128_NEA0,
    ALG_INTEGRITY_128_NIA2,
};
use crate::timer::{EtafTimerConfigs, EtafTimerId, TimerConfig};

// ============================================================================
// Constants
// ============================================================================

/// Default NF name
pub const DEFAULT_ETAF_NAME: &str = "etaf";
/// Default full network name
pub const DEFAULT_NETWORK_FULL_NAME: &str = "free5GC";
/// Default SBI port
pub const DEFAULT_SBI_PORT: u16 = 8000;
/// Default relative capacity advertised to RAN nodes
pub const DEFAULT_RELATIVE_CAPACITY: i64 = 0xff;
/// Largest ETAF UE NGAP ID (2^40 - 1)
pub const MAX_VALUE_OF_ETAF_UE_NGAP_ID: i64 = 1_099_511_627_775;

// ============================================================================
// Configuration Types
// ============================================================================

/// Network name sent in configuration update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkName {
    pub full: String,
    pub short: String,
}

/// Slices supported for one PLMN
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlmnSupportItem {
    pub plmn_id: PlmnId,
    pub snssai_list: Vec<Snssai>,
}

/// NAS security algorithm preference orders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityAlgorithm {
    pub integrity_order: Vec<u8>,
    pub ciphering_order: Vec<u8>,
}

impl Default for SecurityAlgorithm {
    fn default() -> Self {
        Self {
            integrity_order: vec![ALG_INTEGRITY_128_NIA2],
            ciphering_order: vec![ALG_CIPHERING_128_NEA0],
        }
    }
}

/// ETAF configuration snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtafConfig {
    /// NF name
    pub name: String,
    /// SBI URI scheme
    pub uri_scheme: UriScheme,
    /// Address advertised to the NRF
    pub register_ipv4: String,
    /// Address the SBI server binds to
    pub binding_ipv4: String,
    /// SBI port
    pub sbi_port: u16,
    /// NRF URI
    pub nrf_uri: String,
    /// NGAP listen addresses
    pub ngap_ip_list: Vec<String>,
    /// SBI services offered
    pub service_name_list: Vec<String>,
    /// Served GUAMIs; the first one builds GUTIs
    pub served_guami_list: Vec<Guami>,
    /// Served tracking areas
    pub support_tai_list: Vec<Tai>,
    /// Supported PLMNs and slices
    pub plmn_support_list: Vec<PlmnSupportItem>,
    /// Supported DNNs
    pub support_dnn_list: Vec<String>,
    /// NAS security preference orders
    pub security_algorithm: SecurityAlgorithm,
    /// Network name
    pub network_name: NetworkName,
    /// Relative capacity (0..=255)
    pub relative_capacity: i64,
    /// T3502 value in seconds
    pub t3502_value: u32,
    /// T3512 value in seconds
    pub t3512_value: u32,
    /// Non-3GPP deregistration timer value in seconds
    pub non3gpp_deregistration_timer_value: u32,
    /// Procedure timer settings
    pub timers: EtafTimerConfigs,
    /// Upper bound of the ETAF UE NGAP ID space
    pub max_etaf_ue_ngap_id: i64,
}

impl Default for EtafConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ETAF_NAME.to_string(),
            uri_scheme: UriScheme::Https,
            register_ipv4: "127.0.0.1".to_string(),
            binding_ipv4: "127.0.0.1".to_string(),
            sbi_port: DEFAULT_SBI_PORT,
            nrf_uri: String::new(),
            ngap_ip_list: Vec::new(),
            service_name_list: Vec::new(),
            served_guami_list: Vec::new(),
            support_tai_list: Vec::new(),
            plmn_support_list: Vec::new(),
            support_dnn_list: Vec::new(),
            security_algorithm: SecurityAlgorithm::default(),
            network_name: NetworkName {
                full: DEFAULT_NETWORK_FULL_NAME.to_string(),
                short: String::new(),
            },
            relative_capacity: DEFAULT_RELATIVE_CAPACITY,
            t3502_value: 720,
            t3512_value: 3240,
            non3gpp_deregistration_timer_value: 3240,
            timers: EtafTimerConfigs::default(),
            max_etaf_ue_ngap_id: MAX_VALUE_OF_ETAF_UE_NGAP_ID,
        }
    }
}

// ============================================================================
// YAML Loader
// ============================================================================

impl EtafConfig {
    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse from YAML text; a missing `etaf` section yields defaults
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let yaml: Value = serde_yaml::from_str(content)?;
        let mut config = Self::default();

        let section = match yaml.get("etaf") {
            Some(section) => section,
            None => {
                log::warn!("No 'etaf' section in config file");
                return Ok(config);
            }
        };

        if let Some(name) = section.get("name").and_then(|v| v.as_str()) {
            config.name = name.to_string();
        }

        if let Some(sbi) = section.get("sbi") {
            if let Some(scheme) = sbi.get("scheme").and_then(|v| v.as_str()) {
                config.uri_scheme = parse_uri_scheme(scheme)?;
            }
            if let Some(addr) = sbi.get("register_ipv4").and_then(|v| v.as_str()) {
                config.register_ipv4 = addr.to_string();
            }
            if let Some(addr) = sbi.get("binding_ipv4").and_then(|v| v.as_str()) {
                config.binding_ipv4 = addr.to_string();
            }
            if let Some(port) = sbi.get("port").and_then(|v| v.as_u64()) {
                config.sbi_port = u16::try_from(port).map_err(|_| ConfigError::InvalidValue {
                    key: "sbi.port".to_string(),
                    value: port.to_string(),
                })?;
            }
        }

        if let Some(uri) = section.get("nrf_uri").and_then(|v| v.as_str()) {
            config.nrf_uri = uri.to_string();
        }
        config.ngap_ip_list = string_list(section.get("ngap_ip_list"));
        config.service_name_list = string_list(section.get("service_name_list"));
        config.support_dnn_list = string_list(section.get("support_dnn_list"));

        if let Some(list) = section.get("served_guami_list").and_then(|v| v.as_sequence()) {
            for entry in list {
                if let Some(guami) = parse_guami(entry) {
                    log::info!(
                        "Configured GUAMI: PLMN {}-{}, ETAF ID={}",
                        guami.plmn_id.mcc,
                        guami.plmn_id.mnc,
                        guami.amf_id
                    );
                    config.served_guami_list.push(guami);
                }
            }
        }

        if let Some(list) = section.get("support_tai_list").and_then(|v| v.as_sequence()) {
            for entry in list {
                if let Some(tai) = parse_tai(entry) {
                    log::info!(
                        "Configured TAI: PLMN {}-{}, TAC={}",
                        tai.plmn_id.mcc,
                        tai.plmn_id.mnc,
                        tai.tac
                    );
                    config.support_tai_list.push(tai);
                }
            }
        }

        if let Some(list) = section.get("plmn_support_list").and_then(|v| v.as_sequence()) {
            for entry in list {
                if let Some(item) = parse_plmn_support(entry) {
                    config.plmn_support_list.push(item);
                }
            }
        }

        if let Some(security) = section.get("security") {
            if let Some(order) = security.get("integrity_order").and_then(|v| v.as_sequence()) {
                config.security_algorithm.integrity_order =
                    parse_algorithm_order(order, "security.integrity_order", parse_integrity_algorithm)?;
            }
            if let Some(order) = security.get("ciphering_order").and_then(|v| v.as_sequence()) {
                config.security_algorithm.ciphering_order =
                    parse_algorithm_order(order, "security.ciphering_order", parse_ciphering_algorithm)?;
            }
        }

        if let Some(network_name) = section.get("network_name") {
            if let Some(full) = network_name.get("full").and_then(|v| v.as_str()) {
                config.network_name.full = full.to_string();
            }
            if let Some(short) = network_name.get("short").and_then(|v| v.as_str()) {
                config.network_name.short = short.to_string();
            }
        }

        if let Some(capacity) = section.get("relative_capacity").and_then(|v| v.as_i64()) {
            if !(0..=0xff).contains(&capacity) {
                return Err(ConfigError::InvalidValue {
                    key: "relative_capacity".to_string(),
                    value: capacity.to_string(),
                });
            }
            config.relative_capacity = capacity;
        }

        if let Some(v) = section.get("t3502").and_then(|v| v.as_u64()) {
            config.t3502_value = v as u32;
        }
        if let Some(v) = section.get("t3512").and_then(|v| v.as_u64()) {
            config.t3512_value = v as u32;
        }
        if let Some(v) = section
            .get("non3gpp_deregistration_timer")
            .and_then(|v| v.as_u64())
        {
            config.non3gpp_deregistration_timer_value = v as u32;
        }

        if let Some(timers) = section.get("timers") {
            for id in EtafTimerId::ALL {
                let key = id.name().trim_start_matches("ETAF_TIMER_").to_lowercase();
                if let Some(entry) = timers.get(key.as_str()) {
                    let current = config.timers.get(id).clone();
                    *config.timers.get_mut(id) = parse_timer(entry, current);
                }
            }
        }

        if let Some(max) = section.get("max_ran_ue_ngap_id").and_then(|v| v.as_i64()) {
            if max < 1 || max > MAX_VALUE_OF_ETAF_UE_NGAP_ID {
                return Err(ConfigError::InvalidValue {
                    key: "max_ran_ue_ngap_id".to_string(),
                    value: max.to_string(),
                });
            }
            config.max_etaf_ue_ngap_id = max;
        }

        log::info!(
            "ETAF configuration loaded: {} GUAMI, {} TAI, {} PLMN support",
            config.served_guami_list.len(),
            config.support_tai_list.len(),
            config.plmn_support_list.len()
        );
        Ok(config)
    }
}

fn parse_uri_scheme(scheme: &str) -> Result<UriScheme, ConfigError> {
    match scheme {
        "http" => Ok(UriScheme::Http),
        "https" => Ok(UriScheme::Https),
        other => Err(ConfigError::InvalidValue {
            key: "sbi.scheme".to_string(),
            value: other.to_string(),
        }),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_sequence())
        .map(|seq| {
            seq.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Read a digit string that YAML may have parsed as an integer
fn digits(value: &Value, width: usize) -> Option<String> {
    value
        .as_str()
        .map(str::to_string)
        .or_else(|| value.as_u64().map(|n| format!("{:0width$}", n, width = width)))
}

fn parse_plmn_id(value: Option<&Value>) -> Option<PlmnId> {
    let plmn = value?;
    let mcc = digits(plmn.get("mcc")?, 3)?;
    let mnc = digits(plmn.get("mnc")?, 2)?;
    Some(PlmnId { mcc, mnc })
}

fn parse_guami(entry: &Value) -> Option<Guami> {
    let plmn_id = parse_plmn_id(entry.get("plmn_id"))?;
    let amf_id = entry.get("amf_id").and_then(|v| v.as_str())?.to_string();
    Some(Guami { plmn_id, amf_id })
}

fn parse_tai(entry: &Value) -> Option<Tai> {
    let plmn_id = parse_plmn_id(entry.get("plmn_id"))?;
    let tac = entry.get("tac").and_then(|v| {
        v.as_str()
            .map(str::to_string)
            .or_else(|| v.as_u64().map(|n| format!("{:06x}", n)))
    })?;
    Some(Tai { plmn_id, tac })
}

fn parse_plmn_support(entry: &Value) -> Option<PlmnSupportItem> {
    let plmn_id = parse_plmn_id(entry.get("plmn_id"))?;
    let snssai_list = entry
        .get("snssai_list")
        .and_then(|v| v.as_sequence())
        .map(|seq| {
            seq.iter()
                .map(|s| Snssai {
                    sst: s.get("sst").and_then(|v| v.as_i64()).unwrap_or(1) as i32,
                    sd: s.get("sd").and_then(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .or_else(|| v.as_u64().map(|n| format!("{:06x}", n)))
                    }),
                })
                .collect()
        })
        .unwrap_or_default();
    Some(PlmnSupportItem {
        plmn_id,
        snssai_list,
    })
}

fn parse_algorithm_order(
    order: &[Value],
    key: &str,
    parse: fn(&str) -> Option<u8>,
) -> Result<Vec<u8>, ConfigError> {
    order
        .iter()
        .filter_map(|v| v.as_str())
        .map(|name| {
            parse(&name.to_uppercase()).ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                value: name.to_string(),
            })
        })
        .collect()
}

fn parse_timer(entry: &Value, current: TimerConfig) -> TimerConfig {
    let max_count = entry
        .get("max_count")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .unwrap_or(current.max_count);
    let duration = entry
        .get("duration")
        .and_then(|v| v.as_u64())
        .unwrap_or(current.duration.as_secs());
    TimerConfig::new(max_count, duration)
}
