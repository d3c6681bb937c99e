//! Wire codec for L2 payloads: JSON, gzip-compressed above a size threshold.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{CacheConfig, CompressionAlgorithm};
use crate::error::{CacheError, CacheResult};

const GZIP_PREFIX: &str = "gz:";

/// Encodes cache values into store-safe strings and back.
#[derive(Debug, Clone)]
pub struct RateCodec {
    threshold: usize,
    algorithm: CompressionAlgorithm,
}

impl RateCodec {
    /// Create a codec.
    pub fn new(threshold: usize, algorithm: CompressionAlgorithm) -> Self {
        Self {
            threshold,
            algorithm,
        }
    }

    /// Create a codec from the cache configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.compression_threshold, config.compression)
    }

    /// Serialize a value, compressing when it exceeds the threshold.
    pub fn encode<T: Serialize>(&self, value: &T) -> CacheResult<String> {
        let json = serde_json::to_string(value)?;

        match self.algorithm {
            CompressionAlgorithm::Gzip if json.len() > self.threshold => {
                let gzip_err = |e: std::io::Error| CacheError::Serialization(format!("gzip: {}", e));
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(json.as_bytes()).map_err(gzip_err)?;
                let bytes = encoder.finish().map_err(gzip_err)?;
                Ok(format!("{}{}", GZIP_PREFIX, STANDARD.encode(bytes)))
            }
            _ => Ok(json),
        }
    }

    /// Deserialize a value produced by [`RateCodec::encode`].
    pub fn decode<T: DeserializeOwned>(&self, payload: &str) -> CacheResult<T> {
        match payload.strip_prefix(GZIP_PREFIX) {
            Some(encoded) => {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| CacheError::Serialization(format!("base64: {}", e)))?;
                let mut json = String::new();
                GzDecoder::new(bytes.as_slice())
                    .read_to_string(&mut json)
                    .map_err(|e| CacheError::Serialization(format!("gunzip: {}", e)))?;
                Ok(serde_json::from_str(&json)?)
            }
            None => Ok(serde_json::from_str(payload)?),
        }
    }
}

impl Default for RateCodec {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
