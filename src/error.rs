//! Errors raised by net construction, firing and marking edits.
use thiserror::Error;

use crate::net::structure::Tokens;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("unknown id `{0}`")]
    UnknownId(String),
    #[error("id `{0}` is already in use")]
    DuplicateId(String),
    #[error("arc `{arc}` must connect a place and a transition, got `{source_id}` -> `{target_id}`")]
    InvalidArc {
        arc: String,
        source_id: String,
        target_id: String,
    },
    #[error("arcs have not been connected since the last structural change")]
    NotConnected,
    #[error("transition `{0}` is not activated under the current marking")]
    InvalidFire(String),
    #[error("malformed marking `{marking}`: {reason}")]
    MalformedMarking { marking: String, reason: String },
    #[error("place `{place}` cannot hold {tokens} tokens")]
    NegativeMarking { place: String, tokens: Tokens },
}

impl NetError {
    pub(crate) fn malformed(marking: &str, reason: impl Into<String>) -> Self {
        NetError::MalformedMarking {
            marking: marking.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = NetError> = std::result::Result<T, E>;
