// TabHost State Codec
// Serializes the aggregate state, per-window snapshots, the language tag and
// the window sequence counter to and from bytes. The format is JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::errors::CodecError;
use crate::types::snapshot::PersistedWindowSnapshot;
use crate::types::state::AggregateAppState;

/// Stateless codec for everything the core persists.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateCodec;

impl StateCodec {
    pub fn encode_state(&self, state: &AggregateAppState) -> Result<Vec<u8>, CodecError> {
        encode(state)
    }

    pub fn decode_state(&self, bytes: &[u8]) -> Result<AggregateAppState, CodecError> {
        decode(bytes)
    }

    pub fn encode_snapshot(&self, snapshot: &PersistedWindowSnapshot) -> Result<Vec<u8>, CodecError> {
        encode(snapshot)
    }

    pub fn decode_snapshot(&self, bytes: &[u8]) -> Result<PersistedWindowSnapshot, CodecError> {
        decode(bytes)
    }

    /// The language file holds a single JSON string.
    pub fn encode_language(&self, lang: &str) -> Result<Vec<u8>, CodecError> {
        encode(&lang)
    }

    pub fn decode_language(&self, bytes: &[u8]) -> Result<String, CodecError> {
        let lang: String = decode(bytes)?;
        if lang.trim().is_empty() {
            return Err(CodecError::Decode("empty locale tag".to_string()));
        }
        Ok(lang)
    }

    pub fn encode_sequence(&self, next: u64) -> Result<Vec<u8>, CodecError> {
        encode(&next)
    }

    pub fn decode_sequence(&self, bytes: &[u8]) -> Result<u64, CodecError> {
        decode(bytes)
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}
