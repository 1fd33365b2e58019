//! Versioned binary envelope around artifact payloads

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use serde::{Deserialize, Serialize};

/// Magic bytes for scorecast artifact files
pub const MAGIC: [u8; 4] = *b"SCAF";

/// Current envelope layout version
pub const FORMAT_VERSION: u32 = 1;

/// On-disk wrapper: header fields followed by the bincode payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub magic: [u8; 4],
    pub format_version: u32,
    /// Artifact type tag
    pub kind: String,
    /// Per-type schema version
    pub schema_version: u32,
    /// FNV-1a 64 of the payload
    pub checksum: u64,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(kind: &str, schema_version: u32, payload: Vec<u8>) -> Self {
        Self {
            magic: MAGIC,
            format_version: FORMAT_VERSION,
            kind: kind.to_string(),
            schema_version,
            checksum: fnv1a(&payload),
            payload,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).wrap_err(ErrorKind::Persistence, "store.encode")
    }

    /// Decode and verify an envelope holding `kind` at `schema_version`
    pub fn from_bytes(bytes: &[u8], kind: &str, schema_version: u32) -> Result<Self> {
        const STEP: &str = "store.decode";

        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            return Err(PipelineError::corrupt_artifact(STEP, "not a scorecast artifact"));
        }

        let envelope: Envelope = bincode::deserialize(bytes)
            .wrap_err_with(ErrorKind::CorruptArtifact, STEP, || "truncated envelope".to_string())?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(PipelineError::corrupt_artifact(
                STEP,
                format!("unsupported envelope version {}", envelope.format_version),
            ));
        }
        if envelope.kind != kind {
            return Err(PipelineError::corrupt_artifact(
                STEP,
                format!("expected a {} artifact, found {}", kind, envelope.kind),
            ));
        }
        if envelope.schema_version != schema_version {
            return Err(PipelineError::corrupt_artifact(
                STEP,
                format!(
                    "{} schema version {} does not match expected {}",
                    kind, envelope.schema_version, schema_version
                ),
            ));
        }
        if fnv1a(&envelope.payload) != envelope.checksum {
            return Err(PipelineError::corrupt_artifact(STEP, "checksum mismatch"));
        }

        Ok(envelope)
    }
}

/// FNV-1a 64-bit hash
pub fn fnv1a(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_checksum_failure() {
        let envelope = Envelope::new("model", 1, vec![1, 2, 3, 4, 5]);
        let mut bytes = envelope.to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let err = Envelope::from_bytes(&bytes, "model", 1).unwrap_err();
        assert!(err.is(ErrorKind::CorruptArtifact));
        assert!(err.message().contains("checksum"));
    }

    #[test]
    fn test_kind_and_version_checked() {
        let bytes = Envelope::new("model", 1, vec![0; 8]).to_bytes().unwrap();

        assert!(Envelope::from_bytes(&bytes, "model", 1).is_ok());
        assert!(Envelope::from_bytes(&bytes, "preprocessor", 1).is_err());
        assert!(Envelope::from_bytes(&bytes, "model", 2).is_err());
    }

    #[test]
    fn test_bad_magic() {
        let err = Envelope::from_bytes(b"PK\x03\x04rest", "model", 1).unwrap_err();
        assert!(err.is(ErrorKind::CorruptArtifact));

        let err = Envelope::from_bytes(b"SCAF", "model", 1).unwrap_err();
        assert!(err.is(ErrorKind::CorruptArtifact));
    }
}
