//! Drag-and-drop pairing between source tokens and drop targets.
//!
//! A drag is modelled as a message: [`begin_transfer`] packs the dragged value
//! into an opaque [`DragPayload`], and the target side unpacks it with
//! [`accept_transfer`]. Builders record the unpacked value in one of the two
//! [`Assignments`] implementations, which differ only in how repeated drops on
//! the same target merge.

use std::collections::BTreeMap;

use serde::{Serialize, de::DeserializeOwned};

/// Serialized value carried by an in-flight drag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragPayload(String);

impl DragPayload {
    #[cfg(test)]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn begin_transfer<T: Serialize>(value: &T) -> Option<DragPayload> {
    serde_json::to_string(value).ok().map(DragPayload)
}

/// Returns `None` for malformed or empty payloads; callers treat that as a
/// rejected drop.
pub fn accept_transfer<T: DeserializeOwned>(payload: &DragPayload) -> Option<T> {
    serde_json::from_str(payload.as_str()).ok()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropEffect {
    Move,
}

/// One pointer's worth of drag state: what is being carried and which target
/// it currently hovers.
#[derive(Debug)]
pub struct DragSession<T> {
    payload: Option<DragPayload>,
    hovered: Option<T>,
}

impl<T: PartialEq + Clone> DragSession<T> {
    pub fn new() -> Self {
        Self {
            payload: None,
            hovered: None,
        }
    }

    /// Starts carrying `payload`. Any previous drag is abandoned.
    pub fn begin(&mut self, payload: DragPayload) {
        self.hovered = None;
        self.payload = Some(payload);
    }

    /// Must be called while hovering a target for the release to land there.
    pub fn drag_over(&mut self, target: T) -> DropEffect {
        self.hovered = Some(target);
        DropEffect::Move
    }

    pub fn drag_leave(&mut self) {
        self.hovered = None;
    }

    /// Ends the drag. Yields the hovered target and the payload when both are
    /// present; a release outside any target just drops the payload.
    pub fn release(&mut self) -> Option<(T, DragPayload)> {
        let payload = self.payload.take();
        let target = self.hovered.take();
        target.zip(payload)
    }

    pub fn cancel(&mut self) {
        self.payload = None;
        self.hovered = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.payload.is_some()
    }

    pub fn is_over(&self, target: &T) -> bool {
        self.is_dragging() && self.hovered.as_ref() == Some(target)
    }
}

impl<T: PartialEq + Clone> Default for DragSession<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Records which value(s) landed on which target.
pub trait Assignments<K, V> {
    /// Returns `false` when the target does not accept the value.
    fn assign(&mut self, target: K, value: V) -> bool;

    fn clear(&mut self);
}

/// Every drop appends. Only targets that were seeded accept drops.
#[derive(Clone, Debug)]
pub struct AppendAssignments<K: Ord, V> {
    slots: BTreeMap<K, Vec<V>>,
}

impl<K: Ord, V> AppendAssignments<K, V> {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// Creates an empty entry for `target`, keeping any existing one.
    pub fn seed(&mut self, target: K) {
        self.slots.entry(target).or_default();
    }

    pub fn get(&self, target: &K) -> Option<&[V]> {
        self.slots.get(target).map(Vec::as_slice)
    }

    pub fn contains(&self, target: &K) -> bool {
        self.slots.contains_key(target)
    }
}

impl<K: Ord, V> Default for AppendAssignments<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Assignments<K, V> for AppendAssignments<K, V> {
    fn assign(&mut self, target: K, value: V) -> bool {
        match self.slots.get_mut(&target) {
            Some(values) => {
                values.push(value);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Every drop replaces whatever the target held before.
#[derive(Clone, Debug)]
pub struct ReplaceAssignments<K: Ord, V> {
    slots: BTreeMap<K, V>,
}

impl<K: Ord, V> ReplaceAssignments<K, V> {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    pub fn get(&self, target: &K) -> Option<&V> {
        self.slots.get(target)
    }

    pub fn as_map(&self) -> &BTreeMap<K, V> {
        &self.slots
    }
}

impl<K: Ord, V> Default for ReplaceAssignments<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Assignments<K, V> for ReplaceAssignments<K, V> {
    fn assign(&mut self, target: K, value: V) -> bool {
        self.slots.insert(target, value);
        true
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Token {
        id: i64,
        name: String,
    }

    #[test]
    fn transfer_carries_the_full_value() {
        let token = Token {
            id: 1,
            name: "Cat".into(),
        };
        let payload = begin_transfer(&token).unwrap();
        let received: Token = accept_transfer(&payload).unwrap();
        assert_eq!(received, token);
    }

    #[test]
    fn malformed_payload_is_rejected() {
        assert!(accept_transfer::<Token>(&DragPayload::from_raw("")).is_none());
        assert!(accept_transfer::<Token>(&DragPayload::from_raw("{\"id\":")).is_none());
        assert!(accept_transfer::<Token>(&DragPayload::from_raw("{\"name\":\"x\"}")).is_none());
    }

    #[test]
    fn release_needs_a_hovered_target() {
        let apple = begin_transfer(&"apple").unwrap();
        let mut session: DragSession<&str> = DragSession::new();
        session.begin(apple.clone());
        assert!(session.is_dragging());
        assert!(session.release().is_none());
        assert!(!session.is_dragging());

        session.begin(apple);
        assert_eq!(session.drag_over("Fruit"), DropEffect::Move);
        assert!(session.is_over(&"Fruit"));
        assert!(!session.is_over(&"Veg"));

        let (target, payload) = session.release().unwrap();
        assert_eq!(target, "Fruit");
        assert_eq!(accept_transfer::<String>(&payload).unwrap(), "apple");
        assert!(!session.is_over(&"Fruit"));
    }

    #[test]
    fn hover_without_drag_is_not_over() {
        let mut session: DragSession<usize> = DragSession::new();
        session.drag_over(3);
        assert!(!session.is_over(&3));
        assert!(session.release().is_none());
    }

    #[test]
    fn append_keeps_every_drop_and_needs_a_seed() {
        let mut slots: AppendAssignments<String, &str> = AppendAssignments::new();
        assert!(!slots.assign("Animals".into(), "Cat"));

        slots.seed("Animals".into());
        assert!(slots.assign("Animals".into(), "Cat"));
        assert!(slots.assign("Animals".into(), "Cat"));
        assert_eq!(slots.get(&"Animals".to_string()), Some(&["Cat", "Cat"][..]));

        slots.seed("Animals".into());
        assert_eq!(slots.get(&"Animals".to_string()).unwrap().len(), 2);
    }

    #[test]
    fn replace_keeps_only_the_last_drop() {
        let mut slots: ReplaceAssignments<usize, String> = ReplaceAssignments::new();
        slots.assign(1, "b".into());
        slots.assign(1, "c".into());
        assert_eq!(slots.get(&1).map(String::as_str), Some("c"));
        assert_eq!(slots.as_map().len(), 1);

        slots.clear();
        assert!(slots.as_map().is_empty());
    }
}
