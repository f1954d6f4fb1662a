use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};
use super::types::LinkAddr;
use crate::time::Ticks;
use crate::util::duration_to_ticks;

/// Longest delay `clock_lt` can order against the current tick
const MAX_DELAY_TICKS: Ticks = i32::MAX as Ticks;

/// Configuration for a PLB node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdcConfig {
    /// This node's link address
    pub node_addr: LinkAddr,
    /// Next hop override; defaults to `node_addr + 1`
    pub next_hop: Option<LinkAddr>,
    /// Previous hop override; defaults to `node_addr - 1`
    pub prev_hop: Option<LinkAddr>,
    /// Maximum number of times one frame is strobed
    pub strobe_num_max: u32,
    /// Radio-on phase of the duty cycle
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub on_time: Duration,
    /// Radio-off phase of the duty cycle
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub off_time: Duration,
    /// Spacing between a strobe and the first ack sample
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub inter_packet_interval: Duration,
    /// Settle time between detecting activity and reading the ack
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub after_ack_detect_wait: Duration,
    /// Guard time between an acked preamble and the DATA frame
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub pre_data_delay: Duration,
    /// Size of the staging buffer for control frames
    pub max_frame_len: usize,
    /// Maximum number of bytes read while sampling for an ack
    pub ack_read_len: usize,
    /// SYNC_START strobes sent before SYNC_REQ is emitted unprompted
    pub sync_start_threshold: u32,
}

impl Default for RdcConfig {
    fn default() -> Self {
        RdcConfig {
            node_addr: LinkAddr::new(1),
            next_hop: None,
            prev_hop: None,
            strobe_num_max: super::STROBE_NUM_MAX,
            on_time: Duration::from_millis(100),
            off_time: Duration::from_millis(100),
            // RTIMER_SECOND / 5000
            inter_packet_interval: Duration::from_micros(200),
            after_ack_detect_wait: Duration::from_millis(1),
            pre_data_delay: Duration::from_secs(1),
            max_frame_len: super::MAX_FRAME_LEN,
            ack_read_len: super::ACK_READ_LEN,
            sync_start_threshold: super::SYNC_START_THRESHOLD,
        }
    }
}

impl RdcConfig {
    /// Creates the default configuration for a node
    pub fn for_node(node_addr: LinkAddr) -> Self {
        RdcConfig {
            node_addr,
            ..Default::default()
        }
    }

    /// Resolved next hop
    pub fn next_hop(&self) -> LinkAddr {
        self.next_hop.unwrap_or_else(|| self.node_addr.next_hop())
    }

    /// Resolved previous hop, `None` for the first node in the chain
    pub fn prev_hop(&self) -> Option<LinkAddr> {
        match self.prev_hop {
            Some(addr) if addr.is_null() => None,
            Some(addr) => Some(addr),
            None => self.node_addr.previous_hop(),
        }
    }

    /// Checks that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.strobe_num_max == 0 {
            return Err(Error::config("strobe_num_max must be at least 1"));
        }
        if self.on_time.is_zero() || self.off_time.is_zero() {
            return Err(Error::config("duty cycle phases must be non-zero"));
        }
        if self.max_frame_len < 2 {
            return Err(Error::config("max_frame_len cannot hold a type tag"));
        }
        if self.ack_read_len == 0 || self.ack_read_len > self.max_frame_len {
            return Err(Error::config(format!(
                "ack_read_len must be within 1..={}",
                self.max_frame_len
            )));
        }
        if self.sync_start_threshold == 0 {
            return Err(Error::config("sync_start_threshold must be at least 1"));
        }
        Ok(())
    }

    /// Checks that every delay fits the wrapping tick comparison of a
    /// clock running at `ticks_per_second`
    pub fn validate_for_rate(&self, ticks_per_second: u32) -> Result<()> {
        self.validate()?;
        let delays = [
            ("on_time", self.on_time),
            ("off_time", self.off_time),
            ("inter_packet_interval", self.inter_packet_interval),
            ("after_ack_detect_wait", self.after_ack_detect_wait),
            ("pre_data_delay", self.pre_data_delay),
        ];
        for (name, delay) in delays {
            if duration_to_ticks(delay, ticks_per_second) > MAX_DELAY_TICKS {
                return Err(Error::config(format!(
                    "{} of {:?} overflows the tick counter at {} ticks/s",
                    name, delay, ticks_per_second
                )));
            }
        }
        Ok(())
    }

    /// Encodes the configuration for persistent storage
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| Error::encoding(format!("Failed to serialize config: {}", e)))
    }

    /// Decodes and validates a stored configuration
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config: RdcConfig = bincode::deserialize(bytes)
            .map_err(|e| Error::encoding(format!("Failed to deserialize config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RdcConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strobe_num_max, 50);
        assert_eq!(config.on_time, Duration::from_millis(100));
    }

    #[test]
    fn test_hops_follow_chain_convention() {
        let config = RdcConfig::for_node(LinkAddr::new(5));
        assert_eq!(config.next_hop(), LinkAddr::new(6));
        assert_eq!(config.prev_hop(), Some(LinkAddr::new(4)));

        let first = RdcConfig::for_node(LinkAddr::new(1));
        assert_eq!(first.prev_hop(), None);
    }

    #[test]
    fn test_hop_overrides() {
        let config = RdcConfig {
            next_hop: Some(LinkAddr::new(9)),
            prev_hop: Some(LinkAddr::NULL),
            ..RdcConfig::for_node(LinkAddr::new(5))
        };
        assert_eq!(config.next_hop(), LinkAddr::new(9));
        assert_eq!(config.prev_hop(), None);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = RdcConfig {
            strobe_num_max: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = RdcConfig {
            ack_read_len: 200,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RdcConfig {
            off_time: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_delays_must_fit_the_tick_counter() {
        let config = RdcConfig::default();
        assert!(config.validate_for_rate(1_000_000).is_ok());

        let config = RdcConfig {
            pre_data_delay: Duration::from_secs(40 * 60),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.validate_for_rate(1_000_000),
            Err(Error::Config(_))
        ));
        // the same delay fits a slower clock
        assert!(config.validate_for_rate(32_768).is_ok());
    }

    #[test]
    fn test_binary_persistence() {
        let config = RdcConfig {
            next_hop: Some(LinkAddr::new(7)),
            ..RdcConfig::for_node(LinkAddr::new(3))
        };
        let bytes = config.to_bytes().unwrap();
        assert_eq!(RdcConfig::from_bytes(&bytes).unwrap(), config);
        assert!(matches!(
            RdcConfig::from_bytes(&bytes[..3]),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_json_form() {
        let json = serde_json::to_string(&RdcConfig::default()).unwrap();
        assert!(json.contains(r#""inter_packet_interval":200"#));
        let parsed: RdcConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RdcConfig::default());
    }
}
