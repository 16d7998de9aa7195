//! NAS Security Context Helpers
//!
//! Algorithm identifiers, NAS COUNT bookkeeping, the UE security capability
//! bit string and algorithm selection against the configured preference order.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::models::{CipheringAlgorithm, IntegrityAlgorithm};

// ============================================================================
// Constants
// ============================================================================

/// Ciphering algorithm identifiers (TS 33.501)
pub const ALG_CIPHERING_128_NEA0: u8 = 0x00;
pub const ALG_CIPHERING_128_NEA1: u8 = 0x01;
pub const ALG_CIPHERING_128_NEA2: u8 = 0x02;
pub const ALG_CIPHERING_128_NEA3: u8 = 0x03;

/// Integrity algorithm identifiers (TS 33.501)
pub const ALG_INTEGRITY_128_NIA0: u8 = 0x00;
pub const ALG_INTEGRITY_128_NIA1: u8 = 0x01;
pub const ALG_INTEGRITY_128_NIA2: u8 = 0x02;
pub const ALG_INTEGRITY_128_NIA3: u8 = 0x03;

/// ngKSI value meaning "no key is available"
pub const NAS_KSI_NO_KEY_IS_AVAILABLE: u8 = 0x07;

// ============================================================================
// Algorithm Tables
// ============================================================================

/// Map a transfer-payload integrity algorithm to its identifier
pub fn integrity_algorithm_code(alg: IntegrityAlgorithm) -> u8 {
    match alg {
        IntegrityAlgorithm::Nia0 => ALG_INTEGRITY_128_NIA0,
        IntegrityAlgorithm::Nia1 => ALG_INTEGRITY_128_NIA1,
        IntegrityAlgorithm::Nia2 => ALG_INTEGRITY_128_NIA2,
        IntegrityAlgorithm::Nia3 => ALG_INTEGRITY_128_NIA3,
    }
}

/// Map a transfer-payload ciphering algorithm to its identifier
pub fn ciphering_algorithm_code(alg: CipheringAlgorithm) -> u8 {
    match alg {
        CipheringAlgorithm::Nea0 => ALG_CIPHERING_128_NEA0,
        CipheringAlgorithm::Nea1 => ALG_CIPHERING_128_NEA1,
        CipheringAlgorithm::Nea2 => ALG_CIPHERING_128_NEA2,
        CipheringAlgorithm::Nea3 => ALG_CIPHERING_128_NEA3,
    }
}

/// Parse a configured integrity algorithm name ("NIA2", "128-NIA2")
pub fn parse_integrity_algorithm(name: &str) -> Option<u8> {
    match name {
        "NIA0" => Some(ALG_INTEGRITY_128_NIA0),
        "NIA1" | "128-NIA1" => Some(ALG_INTEGRITY_128_NIA1),
        "NIA2" | "128-NIA2" => Some(ALG_INTEGRITY_128_NIA2),
        "NIA3" | "128-NIA3" => Some(ALG_INTEGRITY_128_NIA3),
        _ => None,
    }
}

/// Parse a configured ciphering algorithm name ("NEA0", "128-NEA2")
pub fn parse_ciphering_algorithm(name: &str) -> Option<u8> {
    match name {
        "NEA0" => Some(ALG_CIPHERING_128_NEA0),
        "NEA1" | "128-NEA1" => Some(ALG_CIPHERING_128_NEA1),
        "NEA2" | "128-NEA2" => Some(ALG_CIPHERING_128_NEA2),
        "NEA3" | "128-NEA3" => Some(ALG_CIPHERING_128_NEA3),
        _ => None,
    }
}

/// Algorithm name for logging
pub fn integrity_algorithm_name(alg: u8) -> &'static str {
    match alg {
        ALG_INTEGRITY_128_NIA0 => "NIA0",
        ALG_INTEGRITY_128_NIA1 => "128-NIA1",
        ALG_INTEGRITY_128_NIA2 => "128-NIA2",
        ALG_INTEGRITY_128_NIA3 => "128-NIA3",
        _ => "Unknown",
    }
}

/// Algorithm name for logging
pub fn ciphering_algorithm_name(alg: u8) -> &'static str {
    match alg {
        ALG_CIPHERING_128_NEA0 => "NEA0",
        ALG_CIPHERING_128_NEA1 => "128-NEA1",
        ALG_CIPHERING_128_NEA2 => "128-NEA2",
        ALG_CIPHERING_128_NEA3 => "128-NEA3",
        _ => "Unknown",
    }
}

// ============================================================================
// NAS COUNT
// ============================================================================

/// NAS COUNT split into a 16-bit overflow and an 8-bit sequence number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NasCount {
    pub overflow: u16,
    pub sqn: u8,
}

impl NasCount {
    /// Split a packed 24-bit counter
    pub fn from_packed(count: u32) -> Self {
        Self {
            overflow: ((count & 0x00ff_ff00) >> 8) as u16,
            sqn: (count & 0xff) as u8,
        }
    }

    pub fn set(&mut self, overflow: u16, sqn: u8) {
        self.overflow = overflow;
        self.sqn = sqn;
    }

    /// Packed 24-bit value
    pub fn get(&self) -> u32 {
        ((self.overflow as u32) << 8) | self.sqn as u32
    }
}

// ============================================================================
// UE Security Capability
// ============================================================================

/// UE security capability IE value (TS 24.501 9.11.3.54)
///
/// Octet 0 carries 5G-EA0..EA7, octet 1 carries 5G-IA0..IA7, most significant
/// bit first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UeSecurityCapability {
    pub buffer: Vec<u8>,
}

impl UeSecurityCapability {
    /// Decode from the base64 form used in context transfer
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        Ok(Self {
            buffer: BASE64.decode(encoded)?,
        })
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.buffer)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn bit(&self, octet: usize, alg: u8) -> bool {
        match self.buffer.get(octet) {
            Some(byte) if alg < 8 => byte & (0x80 >> alg) != 0,
            _ => false,
        }
    }

    /// Whether 5G-EA`alg` is supported
    pub fn supports_nea(&self, alg: u8) -> bool {
        self.bit(0, alg)
    }

    /// Whether 5G-IA`alg` is supported
    pub fn supports_nia(&self, alg: u8) -> bool {
        self.bit(1, alg)
    }
}

/// Pick the first algorithm of each preference order the UE supports
///
/// Returns `(ciphering, integrity)`; falls back to NEA0/NIA0 when nothing in
/// the order matches.
pub fn select_security_algorithms(
    capability: &UeSecurityCapability,
    integrity_order: &[u8],
    ciphering_order: &[u8],
) -> (u8, u8) {
    let ciphering = ciphering_order
        .iter()
        .copied()
        .find(|alg| capability.supports_nea(*alg))
        .unwrap_or(ALG_CIPHERING_128_NEA0);
    let integrity = integrity_order
        .iter()
        .copied()
        .find(|alg| capability.supports_nia(*alg))
        .unwrap_or(ALG_INTEGRITY_128_NIA0);

    log::debug!(
        "Selected security algorithms: enc={}, int={}",
        ciphering_algorithm_name(ciphering),
        integrity_algorithm_name(integrity)
    );
    (ciphering, integrity)
}
