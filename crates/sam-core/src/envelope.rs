use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{DomainEvent, EventKind, UnknownEventKind};

/// Self-describing wire message: the event kind plus the canonical JSON body
/// of the matching [`DomainEvent`] variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("unknown event kind '{0}'")]
    UnknownKind(String),
    #[error("malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),
    #[error("failed to serialize {kind} payload: {source}")]
    Serialize {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    kind: String,
    payload: serde_json::Value,
}

pub fn encode(event: &DomainEvent) -> Result<Envelope, EnvelopeError> {
    let kind = event.kind();
    let failed = |source| EnvelopeError::Serialize { kind, source };

    // Going through `Value` gives sorted keys, so equal events always
    // produce identical payload bytes.
    let body = match event {
        DomainEvent::UpsertAcquiredRight(payload) => serde_json::to_value(payload),
        DomainEvent::DeleteAcquiredRight(payload) => serde_json::to_value(payload),
        DomainEvent::UpsertConcurrentUserRecord(payload) => serde_json::to_value(payload),
        DomainEvent::DeleteConcurrentUserRecord(payload) => serde_json::to_value(payload),
        DomainEvent::UpsertNominativeUserRecord(payload) => serde_json::to_value(payload),
        DomainEvent::DeleteNominativeUserRecord(payload) => serde_json::to_value(payload),
        DomainEvent::DeleteProductRecord(payload) => serde_json::to_value(payload),
    }
    .map_err(failed)?;

    Ok(Envelope {
        kind: kind.as_str().to_string(),
        payload: serde_json::to_vec(&body).map_err(failed)?,
    })
}

pub fn decode(envelope: &Envelope) -> Result<DomainEvent, EnvelopeError> {
    let kind: EventKind = envelope
        .kind
        .parse()
        .map_err(|UnknownEventKind(raw)| EnvelopeError::UnknownKind(raw))?;
    let malformed = |source| EnvelopeError::MalformedPayload { kind, source };
    let body = envelope.payload.as_slice();

    let event = match kind {
        EventKind::UpsertAcquiredRight => {
            DomainEvent::UpsertAcquiredRight(serde_json::from_slice(body).map_err(malformed)?)
        }
        EventKind::DeleteAcquiredRight => {
            DomainEvent::DeleteAcquiredRight(serde_json::from_slice(body).map_err(malformed)?)
        }
        EventKind::UpsertConcurrentUserRecord => DomainEvent::UpsertConcurrentUserRecord(
            serde_json::from_slice(body).map_err(malformed)?,
        ),
        EventKind::DeleteConcurrentUserRecord => DomainEvent::DeleteConcurrentUserRecord(
            serde_json::from_slice(body).map_err(malformed)?,
        ),
        EventKind::UpsertNominativeUserRecord => DomainEvent::UpsertNominativeUserRecord(
            serde_json::from_slice(body).map_err(malformed)?,
        ),
        EventKind::DeleteNominativeUserRecord => DomainEvent::DeleteNominativeUserRecord(
            serde_json::from_slice(body).map_err(malformed)?,
        ),
        EventKind::DeleteProductRecord => {
            DomainEvent::DeleteProductRecord(serde_json::from_slice(body).map_err(malformed)?)
        }
    };

    Ok(event)
}

impl Envelope {
    /// Byte form stored in a job: `{"kind": "...", "payload": {...}}`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        let wire = WireEnvelope {
            kind: self.kind.clone(),
            payload: serde_json::from_slice(&self.payload)
                .map_err(EnvelopeError::MalformedEnvelope)?,
        };
        serde_json::to_vec(&wire).map_err(EnvelopeError::MalformedEnvelope)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let wire: WireEnvelope =
            serde_json::from_slice(bytes).map_err(EnvelopeError::MalformedEnvelope)?;
        Ok(Self {
            kind: wire.kind,
            payload: serde_json::to_vec(&wire.payload).map_err(EnvelopeError::MalformedEnvelope)?,
        })
    }
}
