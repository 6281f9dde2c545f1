//! The session's marker store.
//!
//! Validation tasks talk to markers only through the `MarkerSink`
//! capability; this store is the session's implementation. It keeps
//! markers as plain `(message, anchor)` records the host can render
//! however it likes.

use std::collections::HashMap;
use weft_dom::Location;
use weft_tasks::{MarkerId, MarkerSink};

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub message: String,
    pub anchor: Location,
}

#[derive(Debug, Default)]
pub struct MarkerStore {
    next: u64,
    markers: HashMap<MarkerId, Marker>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &Marker)> {
        self.markers.iter().map(|(&id, marker)| (id, marker))
    }
}

impl MarkerSink for MarkerStore {
    fn place_marker(&mut self, message: &str, anchor: Location) -> MarkerId {
        let id = MarkerId(self.next);
        self.next += 1;
        self.markers.insert(
            id,
            Marker {
                message: message.to_string(),
                anchor,
            },
        );
        id
    }

    fn move_marker(&mut self, marker: MarkerId, anchor: Location) {
        if let Some(existing) = self.markers.get_mut(&marker) {
            existing.anchor = anchor;
        }
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        self.markers.remove(&marker);
    }
}
