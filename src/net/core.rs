//! 运行时: 激活集、发生语义与标识重置.
use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{NetError, Result};
use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::IndexVec;
use crate::net::io::NetDefinition;
use crate::net::structure::{
    Arc, ArcDirection, ArcEnds, Marking, NodeRef, Place, Tokens, Transition,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKey {
    Place(PlaceId),
    Transition(TransitionId),
}

#[derive(Debug, Clone)]
pub struct Net {
    pub places: IndexVec<PlaceId, Place>,
    pub transitions: IndexVec<TransitionId, Transition>,
    pub arcs: IndexVec<ArcId, Arc>,
    nodes: IndexMap<String, NodeKey>,
    arc_ids: IndexMap<String, ArcId>,
    /// Places sorted by id; the component order of every [`Marking`].
    canonical: Vec<PlaceId>,
    pre: Incidence,
    post: Incidence,
    connected: bool,
}

impl Net {
    pub fn empty() -> Self {
        Self {
            places: IndexVec::new(),
            transitions: IndexVec::new(),
            arcs: IndexVec::new(),
            nodes: IndexMap::new(),
            arc_ids: IndexMap::new(),
            canonical: Vec::new(),
            pre: Incidence::new(0, 0),
            post: Incidence::new(0, 0),
            connected: false,
        }
    }

    /// Builds and connects a net from already-parsed structural data.
    pub fn build(definition: &NetDefinition) -> Result<Self> {
        let mut net = Net::empty();
        for place in &definition.places {
            net.add_place(&place.id)?;
            net.set_name(&place.id, &place.name)?;
            net.set_initial_marking(&place.id, place.tokens)?;
        }
        for transition in &definition.transitions {
            net.add_transition(&transition.id)?;
            net.set_name(&transition.id, &transition.name)?;
        }
        for arc in &definition.arcs {
            net.add_arc(&arc.id, &arc.source, &arc.target)?;
        }
        net.connect_arcs()?;
        debug!(
            "built net with {} places, {} transitions, {} arcs",
            net.places_len(),
            net.transitions_len(),
            net.arcs.len()
        );
        Ok(net)
    }

    pub fn add_place(&mut self, id: &str) -> Result<PlaceId> {
        if self.nodes.contains_key(id) {
            return Err(NetError::DuplicateId(id.to_string()));
        }
        let place_id = self.places.push(Place::new(id));
        self.nodes.insert(id.to_string(), NodeKey::Place(place_id));
        let places = &self.places;
        let slot = self
            .canonical
            .partition_point(|&other| places[other].id.as_str() < id);
        self.canonical.insert(slot, place_id);
        self.connected = false;
        Ok(place_id)
    }

    pub fn add_transition(&mut self, id: &str) -> Result<TransitionId> {
        if self.nodes.contains_key(id) {
            return Err(NetError::DuplicateId(id.to_string()));
        }
        let transition_id = self.transitions.push(Transition::new(id));
        self.nodes
            .insert(id.to_string(), NodeKey::Transition(transition_id));
        self.connected = false;
        Ok(transition_id)
    }

    /// Endpoints are resolved by [`Net::connect_arcs`], so they may be
    /// declared after the arc.
    pub fn add_arc(&mut self, id: &str, source: &str, target: &str) -> Result<ArcId> {
        if self.arc_ids.contains_key(id) {
            return Err(NetError::DuplicateId(id.to_string()));
        }
        let arc_id = self.arcs.push(Arc::new(id, source, target));
        self.arc_ids.insert(id.to_string(), arc_id);
        self.connected = false;
        Ok(arc_id)
    }

    pub fn set_name(&mut self, id: &str, name: &str) -> Result<()> {
        match self.node_key(id)? {
            NodeKey::Place(place) => self.places[place].name = name.to_string(),
            NodeKey::Transition(transition) => {
                self.transitions[transition].name = name.to_string()
            }
        }
        Ok(())
    }

    /// Links every arc into its endpoints' incoming/outgoing sets and
    /// rebuilds the multiplicity matrices. Parallel arcs stay distinct.
    pub fn connect_arcs(&mut self) -> Result<()> {
        let mut resolved = Vec::with_capacity(self.arcs.len());
        for arc in self.arcs.iter() {
            let ends = match (self.node_key(&arc.source)?, self.node_key(&arc.target)?) {
                (NodeKey::Place(place), NodeKey::Transition(transition)) => ArcEnds {
                    place,
                    transition,
                    direction: ArcDirection::PlaceToTransition,
                },
                (NodeKey::Transition(transition), NodeKey::Place(place)) => ArcEnds {
                    place,
                    transition,
                    direction: ArcDirection::TransitionToPlace,
                },
                _ => {
                    return Err(NetError::InvalidArc {
                        arc: arc.id.clone(),
                        source_id: arc.source.clone(),
                        target_id: arc.target.clone(),
                    });
                }
            };
            resolved.push(ends);
        }

        for place in self.places.iter_mut() {
            place.inputs.clear();
            place.outputs.clear();
        }
        for transition in self.transitions.iter_mut() {
            transition.inputs.clear();
            transition.outputs.clear();
        }
        self.pre = Incidence::new(self.places_len(), self.transitions_len());
        self.post = Incidence::new(self.places_len(), self.transitions_len());

        for (arc_id, ends) in self.arcs.indices().zip(resolved) {
            self.arcs[arc_id].ends = Some(ends);
            match ends.direction {
                ArcDirection::PlaceToTransition => {
                    self.places[ends.place].outputs.push(arc_id);
                    self.transitions[ends.transition].inputs.push(arc_id);
                    self.pre.increment(ends.place, ends.transition);
                }
                ArcDirection::TransitionToPlace => {
                    self.transitions[ends.transition].outputs.push(arc_id);
                    self.places[ends.place].inputs.push(arc_id);
                    self.post.increment(ends.place, ends.transition);
                }
            }
        }
        self.connected = true;
        self.refresh_activation();
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Recomputes every activation flag from the current token counts.
    pub fn refresh_activation(&mut self) {
        for transition in self.transitions.indices() {
            let activated = self.connected && self.enabled_under_current(transition);
            self.transitions[transition].activated = activated;
        }
    }

    fn enabled_under_current(&self, transition: TransitionId) -> bool {
        self.pre
            .column(transition)
            .all(|(place, _)| self.places[place].tokens >= 1)
    }

    /// Activated transitions in declaration order.
    pub fn activated_transitions(&self) -> Vec<TransitionId> {
        self.transitions
            .iter_enumerated()
            .filter(|(_, transition)| transition.activated)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn fire(&mut self, transition: &str) -> Result<()> {
        let id = self
            .transition_id(transition)
            .ok_or_else(|| NetError::UnknownId(transition.to_string()))?;
        self.fire_id(id)
    }

    /// Consumes one token per incoming arc instance and produces one per
    /// outgoing arc instance.
    pub fn fire_id(&mut self, transition: TransitionId) -> Result<()> {
        if !self.connected {
            return Err(NetError::NotConnected);
        }
        let Some(entry) = self.transitions.get(transition) else {
            return Err(NetError::UnknownId(format!("{:?}", transition)));
        };
        if !entry.activated {
            return Err(NetError::InvalidFire(entry.id.clone()));
        }

        for (place, count) in self.pre.column(transition) {
            let after = self.places[place].tokens - Tokens::from(count);
            self.places[place].tokens = after;
            if after < 0 {
                warn!(
                    "firing `{}` drove place `{}` to {} tokens",
                    self.transitions[transition].id, self.places[place].id, after
                );
            }
        }
        for (place, count) in self.post.column(transition) {
            self.places[place].tokens += Tokens::from(count);
        }
        self.refresh_activation();
        debug!(
            "fired `{}` -> {}",
            self.transitions[transition].id,
            self.marking()
        );
        Ok(())
    }

    pub fn marking(&self) -> Marking {
        Marking::new(
            self.canonical
                .iter()
                .map(|&place| self.places[place].tokens)
                .collect(),
        )
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::new(
            self.canonical
                .iter()
                .map(|&place| self.places[place].initial)
                .collect(),
        )
    }

    pub fn reset_to_initial(&mut self) {
        for place in self.places.iter_mut() {
            place.tokens = place.initial;
        }
        self.refresh_activation();
    }

    /// Parses a canonical marking and makes it the current one. Initial
    /// counts are left alone.
    pub fn reset_to_marking(&mut self, marking: &str) -> Result<()> {
        let parsed = Marking::parse_with_len(marking, self.places_len())?;
        self.restore(&parsed)
    }

    pub fn restore(&mut self, marking: &Marking) -> Result<()> {
        if marking.len() != self.places_len() {
            return Err(NetError::malformed(
                &marking.to_string(),
                format!(
                    "expected {} components, found {}",
                    self.places_len(),
                    marking.len()
                ),
            ));
        }
        for (&place, &tokens) in self.canonical.iter().zip(marking.iter()) {
            self.places[place].tokens = tokens;
        }
        self.refresh_activation();
        Ok(())
    }

    /// Sets both the initial and the current count of one place.
    pub fn set_initial_marking(&mut self, place: &str, count: Tokens) -> Result<()> {
        let id = self
            .place_id(place)
            .ok_or_else(|| NetError::UnknownId(place.to_string()))?;
        if count < 0 {
            return Err(NetError::NegativeMarking {
                place: place.to_string(),
                tokens: count,
            });
        }
        let entry = &mut self.places[id];
        entry.initial = count;
        entry.tokens = count;
        self.refresh_activation();
        Ok(())
    }

    /// Makes the current marking the initial one for every place.
    pub fn commit_initial_marking(&mut self) {
        for place in self.places.iter_mut() {
            place.initial = place.tokens;
        }
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    /// Places in marking component order.
    pub fn canonical_places(&self) -> impl Iterator<Item = &Place> {
        self.canonical.iter().map(|&place| &self.places[place])
    }

    fn node_key(&self, id: &str) -> Result<NodeKey> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| NetError::UnknownId(id.to_string()))
    }

    pub fn node(&self, id: &str) -> Option<NodeRef<'_>> {
        match self.nodes.get(id)? {
            NodeKey::Place(place) => Some(NodeRef::Place(*place, &self.places[*place])),
            NodeKey::Transition(transition) => Some(NodeRef::Transition(
                *transition,
                &self.transitions[*transition],
            )),
        }
    }

    pub fn place_id(&self, id: &str) -> Option<PlaceId> {
        match self.nodes.get(id)? {
            NodeKey::Place(place) => Some(*place),
            NodeKey::Transition(_) => None,
        }
    }

    pub fn transition_id(&self, id: &str) -> Option<TransitionId> {
        match self.nodes.get(id)? {
            NodeKey::Transition(transition) => Some(*transition),
            NodeKey::Place(_) => None,
        }
    }

    pub fn arc(&self, id: &str) -> Option<&Arc> {
        self.arc_ids.get(id).map(|&arc| &self.arcs[arc])
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}
