//! P/T 网静态结构元素：库所、迁移、弧与标识。
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::NetError;
use crate::net::ids::{ArcId, PlaceId, TransitionId};

/// Token count of a place.
///
/// Signed: parallel input arcs consume one token each even when
/// the place only holds one, so a firing can leave a place negative.
pub type Tokens = i64;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub initial: Tokens,
    pub tokens: Tokens,
    /// Arcs ending in this place, filled by `Net::connect_arcs`.
    pub inputs: Vec<ArcId>,
    /// Arcs leaving this place, filled by `Net::connect_arcs`.
    pub outputs: Vec<ArcId>,
}

impl Place {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            initial: 0,
            tokens: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub activated: bool,
    pub inputs: Vec<ArcId>,
    pub outputs: Vec<ArcId>,
}

impl Transition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            activated: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition")
            .field(&self.id)
            .field(&self.activated)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

/// Place and transition an arc joins, resolved when arcs are connected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ArcEnds {
    pub place: PlaceId,
    pub transition: TransitionId,
    pub direction: ArcDirection,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Arc {
    pub id: String,
    pub source: String,
    pub target: String,
    pub ends: Option<ArcEnds>,
}

impl Arc {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            ends: None,
        }
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arc")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

/// A net node looked up by its id.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'net> {
    Place(PlaceId, &'net Place),
    Transition(TransitionId, &'net Transition),
}

impl<'net> NodeRef<'net> {
    pub fn id(&self) -> &'net str {
        match self {
            NodeRef::Place(_, place) => &place.id,
            NodeRef::Transition(_, transition) => &transition.id,
        }
    }

    pub fn name(&self) -> &'net str {
        match self {
            NodeRef::Place(_, place) => &place.name,
            NodeRef::Transition(_, transition) => &transition.name,
        }
    }

    pub fn inputs(&self) -> &'net [ArcId] {
        match self {
            NodeRef::Place(_, place) => &place.inputs,
            NodeRef::Transition(_, transition) => &transition.inputs,
        }
    }

    pub fn outputs(&self) -> &'net [ArcId] {
        match self {
            NodeRef::Place(_, place) => &place.outputs,
            NodeRef::Transition(_, transition) => &transition.outputs,
        }
    }
}

/// Token counts of all places, ordered by place id.
///
/// The canonical text form is `(c1|c2|...|cn)`; two markings are equal
/// exactly when their texts are equal.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Marking(pub Vec<Tokens>);

impl Marking {
    pub fn new(tokens: Vec<Tokens>) -> Self {
        Self(tokens)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tokens> {
        self.0.iter()
    }

    pub fn total(&self) -> Tokens {
        self.0.iter().sum()
    }

    /// `self` dominates `ancestor` when no component is smaller.
    pub fn dominates(&self, ancestor: &Marking) -> bool {
        matches!(
            self.partial_cmp(ancestor),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    /// Parses the canonical form, checking the component count.
    pub fn parse_with_len(text: &str, places: usize) -> Result<Self, NetError> {
        let marking: Marking = text.parse()?;
        if marking.len() != places {
            return Err(NetError::malformed(
                text,
                format!("expected {} components, found {}", places, marking.len()),
            ));
        }
        Ok(marking)
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join("|"))
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Marking {
    type Err = NetError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let inner = text
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| NetError::malformed(text, "expected surrounding parentheses"))?;
        if inner.is_empty() {
            return Ok(Marking::default());
        }
        inner
            .split('|')
            .map(|component| {
                let digits = component.strip_prefix('-').unwrap_or(component);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(NetError::malformed(
                        text,
                        format!("`{}` is not a token count", component),
                    ));
                }
                if (digits.len() > 1 && digits.starts_with('0')) || component == "-0" {
                    return Err(NetError::malformed(
                        text,
                        format!("`{}` is not in canonical form", component),
                    ));
                }
                component
                    .parse::<Tokens>()
                    .map_err(|err| NetError::malformed(text, err.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Marking)
    }
}

impl PartialOrd for Marking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.len() != other.len() {
            return None;
        }
        let mut less = false;
        let mut greater = false;
        for (left, right) in self.0.iter().zip(other.0.iter()) {
            match left.cmp(right) {
                Ordering::Less => less = true,
                Ordering::Greater => greater = true,
                Ordering::Equal => {}
            }
        }
        match (less, greater) {
            (true, true) => None,
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => Some(Ordering::Equal),
        }
    }
}
