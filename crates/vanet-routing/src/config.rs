// ============================================
// File: crates/vanet-routing/src/config.rs
// ============================================
//! # Protocol Configuration
//!
//! ## Creation Reason
//! Collects every tunable of the secure routing protocol in one TOML
//! document so a simulation harness can load it per vehicle.
//!
//! ## Main Functionality
//! - `ProtocolConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Defaults matching the reference protocol constants
//!
//! ## Configuration Sections
//! - `crypto`: Keys, certificates, freshness window, replay cache
//! - `trust`: Trust threshold and EMA weight
//! - `kinematics`: Speed and acceleration limits
//! - `routing`: Route/neighbour lifetimes, hop limit, discovery buffer
//! - `detection.black_hole`: Forwarding-ratio heuristic thresholds
//! - `detection.sybil`: Colocation heuristic thresholds
//!
//! ## Example Configuration
//! ```toml
//! [crypto]
//! signature_algorithm = "ecdsa"
//! message_timeout_ms = 5000
//!
//! [trust]
//! threshold = 0.5
//! ema_alpha = 0.3
//!
//! [kinematics]
//! max_speed_kmh = 200.0
//! max_acceleration = 10.0
//!
//! [routing]
//! route_timeout_secs = 60
//! neighbor_timeout_secs = 10
//! max_hop_count = 10
//! max_pending_per_destination = 16
//!
//! [detection.black_hole]
//! min_advertisements = 3
//! min_packets_handed = 5
//! min_forward_ratio = 0.5
//!
//! [detection.sybil]
//! colocation_radius_m = 1.0
//! window_ms = 1000
//! max_colocated_identities = 1
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every section is optional; missing sections take their defaults
//! - Validate before constructing an engine (`SecureRoutingEngine::new`
//!   does this for you)
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use vanet_crypto::config::CryptoConfig;

use crate::error::{Result, RoutingError};
use crate::kinematics::KinematicLimits;

// ============================================
// ProtocolConfig
// ============================================

/// Main protocol configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Cryptographic message layer.
    #[serde(default)]
    pub crypto: CryptoConfig,

    /// Trust scoring.
    #[serde(default)]
    pub trust: TrustConfig,

    /// Kinematic plausibility limits.
    #[serde(default)]
    pub kinematics: KinematicLimits,

    /// Route and neighbour table behaviour.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Misbehaviour heuristics.
    #[serde(default)]
    pub detection: DetectionConfig,
}

impl ProtocolConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!(path = %path_str, "Loading protocol configuration");

        let content = std::fs::read_to_string(path)
            .map_err(|e| RoutingError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| RoutingError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Protocol configuration loaded");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the document cannot be parsed or validated.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RoutingError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending section.
    pub fn validate(&self) -> Result<()> {
        self.crypto
            .validate()
            .map_err(|e| RoutingError::config_invalid("crypto", e))?;
        self.trust
            .validate()
            .map_err(|e| RoutingError::config_invalid("trust", e))?;
        self.kinematics
            .validate()
            .map_err(|e| RoutingError::config_invalid("kinematics", e))?;
        self.routing.validate()?;
        self.detection.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

// ============================================
// TrustConfig
// ============================================

/// Trust scoring (`[trust]` section).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Minimum score for a peer to be trusted.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Weight of a new observation in the moving average.
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,
}

fn default_threshold() -> f64 {
    0.5
}

fn default_ema_alpha() -> f64 {
    0.3
}

impl TrustConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err("threshold must be within [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.ema_alpha) {
            return Err("ema_alpha must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            ema_alpha: default_ema_alpha(),
        }
    }
}

// ============================================
// RoutingConfig
// ============================================

/// Route and neighbour table behaviour (`[routing]` section).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Route lifetime in seconds.
    #[serde(default = "default_route_timeout_secs")]
    pub route_timeout_secs: u64,

    /// Neighbour lifetime in seconds, measured from its last position.
    #[serde(default = "default_neighbor_timeout_secs")]
    pub neighbor_timeout_secs: u64,

    /// Routes must have strictly fewer hops than this.
    #[serde(default = "default_max_hop_count")]
    pub max_hop_count: u32,

    /// Payloads buffered per destination while a route is discovered.
    #[serde(default = "default_max_pending_per_destination")]
    pub max_pending_per_destination: usize,
}

fn default_route_timeout_secs() -> u64 {
    60
}

fn default_neighbor_timeout_secs() -> u64 {
    10
}

fn default_max_hop_count() -> u32 {
    10
}

fn default_max_pending_per_destination() -> usize {
    16
}

impl RoutingConfig {
    fn validate(&self) -> Result<()> {
        if self.route_timeout_secs == 0 {
            return Err(RoutingError::config_invalid(
                "routing.route_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.neighbor_timeout_secs == 0 {
            return Err(RoutingError::config_invalid(
                "routing.neighbor_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.max_hop_count == 0 {
            return Err(RoutingError::config_invalid(
                "routing.max_hop_count",
                "must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Route lifetime.
    #[must_use]
    pub const fn route_timeout(&self) -> Duration {
        Duration::from_secs(self.route_timeout_secs)
    }

    /// Neighbour lifetime.
    #[must_use]
    pub const fn neighbor_timeout(&self) -> Duration {
        Duration::from_secs(self.neighbor_timeout_secs)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            route_timeout_secs: default_route_timeout_secs(),
            neighbor_timeout_secs: default_neighbor_timeout_secs(),
            max_hop_count: default_max_hop_count(),
            max_pending_per_destination: default_max_pending_per_destination(),
        }
    }
}

// ============================================
// DetectionConfig
// ============================================

/// Misbehaviour heuristics (`[detection]` section).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Black-hole heuristic.
    #[serde(default)]
    pub black_hole: BlackHoleConfig,

    /// Sybil heuristic.
    #[serde(default)]
    pub sybil: SybilConfig,
}

impl DetectionConfig {
    fn validate(&self) -> Result<()> {
        let ratio = self.black_hole.min_forward_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(RoutingError::config_invalid(
                "detection.black_hole.min_forward_ratio",
                "must be within [0, 1]",
            ));
        }

        let radius = self.sybil.colocation_radius_m;
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(RoutingError::config_invalid(
                "detection.sybil.colocation_radius_m",
                "must be a non-negative number",
            ));
        }

        if self.sybil.max_colocated_identities == 0 {
            return Err(RoutingError::config_invalid(
                "detection.sybil.max_colocated_identities",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Thresholds of the forwarding-ratio black-hole heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlackHoleConfig {
    /// Route advertisements needed before a peer can be judged.
    #[serde(default = "default_min_advertisements")]
    pub min_advertisements: u64,

    /// Packets handed to the peer needed before it can be judged.
    #[serde(default = "default_min_packets_handed")]
    pub min_packets_handed: u64,

    /// Forwarded/handed ratio below which the peer is flagged.
    #[serde(default = "default_min_forward_ratio")]
    pub min_forward_ratio: f64,
}

fn default_min_advertisements() -> u64 {
    3
}

fn default_min_packets_handed() -> u64 {
    5
}

fn default_min_forward_ratio() -> f64 {
    0.5
}

impl Default for BlackHoleConfig {
    fn default() -> Self {
        Self {
            min_advertisements: default_min_advertisements(),
            min_packets_handed: default_min_packets_handed(),
            min_forward_ratio: default_min_forward_ratio(),
        }
    }
}

/// Thresholds of the colocation Sybil heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SybilConfig {
    /// Identities closer than this are considered colocated.
    #[serde(default = "default_colocation_radius_m")]
    pub colocation_radius_m: f64,

    /// Position samples further apart in time are not compared.
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Identities allowed to share one spot, the suspect included.
    #[serde(default = "default_max_colocated_identities")]
    pub max_colocated_identities: usize,
}

fn default_colocation_radius_m() -> f64 {
    1.0
}

fn default_window_ms() -> u64 {
    1_000
}

fn default_max_colocated_identities() -> usize {
    1
}

impl Default for SybilConfig {
    fn default() -> Self {
        Self {
            colocation_radius_m: default_colocation_radius_m(),
            window_ms: default_window_ms(),
            max_colocated_identities: default_max_colocated_identities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use vanet_crypto::keys::SignatureAlgorithm;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trust.threshold, 0.5);
        assert_eq!(config.trust.ema_alpha, 0.3);
        assert_eq!(config.routing.route_timeout(), Duration::from_secs(60));
        assert_eq!(config.routing.neighbor_timeout(), Duration::from_secs(10));
        assert_eq!(config.routing.max_hop_count, 10);
        assert_eq!(config.kinematics.max_speed_kmh, 200.0);
    }

    #[test]
    fn test_partial_document() {
        let toml = r#"
            [crypto]
            signature_algorithm = "ed25519"

            [trust]
            threshold = 0.6

            [detection.sybil]
            colocation_radius_m = 2.5
        "#;

        let config = ProtocolConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.crypto.signature_algorithm, SignatureAlgorithm::Ed25519);
        assert_eq!(config.trust.threshold, 0.6);
        assert_eq!(config.trust.ema_alpha, 0.3);
        assert_eq!(config.detection.sybil.colocation_radius_m, 2.5);
        assert_eq!(config.detection.sybil.window_ms, 1_000);
        assert_eq!(config.detection.black_hole.min_advertisements, 3);
    }

    #[test]
    fn test_invalid_values() {
        let err = ProtocolConfig::from_toml_str("[trust]\nthreshold = 1.5\n").unwrap_err();
        assert!(matches!(err, RoutingError::ConfigInvalid { ref field, .. } if field == "trust"));

        let err = ProtocolConfig::from_toml_str("[routing]\nmax_hop_count = 0\n").unwrap_err();
        assert!(err.is_config_error());

        let err = ProtocolConfig::from_toml_str("[crypto]\nrsa_modulus_bits = 1024\n").unwrap_err();
        assert!(matches!(err, RoutingError::ConfigInvalid { ref field, .. } if field == "crypto"));

        let err = ProtocolConfig::from_toml_str("[routing\n").unwrap_err();
        assert!(matches!(err, RoutingError::ConfigLoad { .. }));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = ProtocolConfig::default();
        config.routing.max_pending_per_destination = 4;
        let parsed = ProtocolConfig::from_toml_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[routing]\nroute_timeout_secs = 30").unwrap();

        let config = ProtocolConfig::load(file.path()).unwrap();
        assert_eq!(config.routing.route_timeout_secs, 30);

        let missing = ProtocolConfig::load("/nonexistent/vanet.toml").unwrap_err();
        assert!(matches!(missing, RoutingError::ConfigLoad { .. }));
    }
}
