// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Content Hashing
//!
//! Deterministic fingerprints used to label commits and approval requests.
//! The default [`RollingHash32`] is 32 bits wide, so identity is
//! probabilistic rather than cryptographic. [`Blake3Hasher`] can be swapped
//! in through [`HashAlgorithm`] without touching the rest of the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Fingerprints text content
pub trait ContentHasher: Send + Sync + fmt::Debug {
    /// Algorithm name, as written in configuration
    fn name(&self) -> &'static str;

    /// Hash `content` into a fixed-width lowercase hex token
    fn hash(&self, content: &str) -> String;
}

/// `h = h * 31 + unit` over UTF-16 code units, wrapping at 32 bits
#[derive(Debug, Clone, Copy, Default)]
pub struct RollingHash32;

impl ContentHasher for RollingHash32 {
    fn name(&self) -> &'static str {
        "rolling32"
    }

    fn hash(&self, content: &str) -> String {
        let mut h: i32 = 0;
        for unit in content.encode_utf16() {
            h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit));
        }
        format!("{:08x}", h as u32)
    }
}

/// BLAKE3 digest (64 hex chars)
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl ContentHasher for Blake3Hasher {
    fn name(&self) -> &'static str {
        "blake3"
    }

    fn hash(&self, content: &str) -> String {
        blake3::hash(content.as_bytes()).to_hex().to_string()
    }
}

/// Configurable hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 32-bit rolling hash (compatible default)
    #[default]
    Rolling32,
    /// BLAKE3
    Blake3,
}

impl HashAlgorithm {
    /// Build the hasher for this algorithm
    pub fn hasher(self) -> Arc<dyn ContentHasher> {
        match self {
            HashAlgorithm::Rolling32 => Arc::new(RollingHash32),
            HashAlgorithm::Blake3 => Arc::new(Blake3Hasher),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Rolling32 => write!(f, "rolling32"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rolling32" => Ok(HashAlgorithm::Rolling32),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(format!("unknown hash algorithm: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_known_values() {
        let h = RollingHash32;
        assert_eq!(h.hash(""), "00000000");
        assert_eq!(h.hash("a"), "00000061");
        assert_eq!(h.hash("ab"), "00000c21");
    }

    #[test]
    fn test_rolling_is_order_sensitive() {
        let h = RollingHash32;
        assert_ne!(h.hash("ab"), h.hash("ba"));
        assert_eq!(h.hash("hello"), h.hash("hello"));
    }

    #[test]
    fn test_rolling_wraps_on_long_unicode_input() {
        let h = RollingHash32;
        let text = "日本語のテキスト 🚀 ".repeat(500);
        let token = h.hash(&text);
        assert_eq!(token.len(), 8);
        assert_eq!(token, h.hash(&text));
    }

    #[test]
    fn test_blake3_width() {
        let h = Blake3Hasher;
        assert_eq!(h.hash("").len(), 64);
        assert_ne!(h.hash("a"), h.hash("b"));
    }

    #[test]
    fn test_algorithm_parse_and_build() {
        assert_eq!("BLAKE3".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Blake3);
        assert!("md5".parse::<HashAlgorithm>().is_err());
        assert_eq!(HashAlgorithm::default().hasher().name(), "rolling32");
        assert_eq!(HashAlgorithm::Blake3.to_string(), "blake3");
    }
}
