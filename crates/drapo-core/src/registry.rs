//! Registry of live interactive objects.

use crate::host::{CanvasId, SubregionId};
use crate::lifecycle::ObjectCore;
use crate::shapes::{Object, ObjectKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of an interactive object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extent of a group operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Every canvas.
    All,
    /// The canvas of the reference object.
    SameCanvas,
    /// The subregion of the reference object.
    SameSubregion,
}

/// A registered object: bookkeeping plus variant payload.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub core: ObjectCore,
    pub object: Object,
}

/// Objects by id, indexed by kind.
///
/// Erased objects stay registered; only deletion unregisters.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: HashMap<ObjectId, ObjectEntry>,
    by_kind: HashMap<ObjectKind, HashSet<ObjectId>>,
    /// Registration order, for deterministic iteration.
    order: Vec<ObjectId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, entry: ObjectEntry) -> ObjectId {
        let id = entry.core.id;
        self.by_kind.entry(entry.core.kind).or_default().insert(id);
        self.order.push(id);
        self.entries.insert(id, entry);
        log::debug!("Registered {} {}", id, self.entries[&id].core.kind.name());
        id
    }

    pub(crate) fn unregister(&mut self, id: ObjectId) -> Option<ObjectEntry> {
        let entry = self.entries.remove(&id)?;
        if let Some(ids) = self.by_kind.get_mut(&entry.core.kind) {
            ids.remove(&id);
        }
        self.order.retain(|o| *o != id);
        log::debug!("Unregistered {} {}", id, entry.core.kind.name());
        Some(entry)
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectEntry> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut ObjectEntry> {
        self.entries.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered objects of `kind`.
    pub fn instances_of(&self, kind: ObjectKind) -> HashSet<ObjectId> {
        self.by_kind.get(&kind).cloned().unwrap_or_default()
    }

    /// Every registered object.
    pub fn all_instances(&self) -> HashSet<ObjectId> {
        self.entries.keys().copied().collect()
    }

    /// Registered objects in registration order.
    pub fn ordered(&self) -> &[ObjectId] {
        &self.order
    }

    /// Objects hosted by `canvas`, in registration order.
    pub fn on_canvas(&self, canvas: CanvasId) -> Vec<ObjectId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.entries[id].core.canvas == canvas)
            .collect()
    }

    /// Objects drawn in `subregion`, in registration order.
    pub fn in_subregion(&self, subregion: SubregionId) -> Vec<ObjectId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.entries[id].core.subregion == subregion)
            .collect()
    }

    /// Other objects of the same kind as `id`, within `scope` of it.
    pub fn peers(&self, id: ObjectId, scope: Scope) -> Vec<ObjectId> {
        let Some(reference) = self.entries.get(&id) else {
            return Vec::new();
        };
        let core = &reference.core;
        self.order
            .iter()
            .copied()
            .filter(|other| *other != id)
            .filter(|other| {
                let o = &self.entries[other].core;
                o.kind == core.kind
                    && match scope {
                        Scope::All => true,
                        Scope::SameCanvas => o.canvas == core.canvas,
                        Scope::SameSubregion => o.subregion == core.subregion,
                    }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Line, LineOptions, Rectangle, RectangleOptions};
    use crate::style::SerializableColor;
    use kurbo::Affine;

    fn line_entry(canvas: u32, subregion: u32) -> ObjectEntry {
        ObjectEntry {
            core: ObjectCore::new(
                ObjectId::new(),
                ObjectKind::Line,
                CanvasId(canvas),
                SubregionId(subregion),
                Affine::IDENTITY,
            ),
            object: Object::Line(Line::new(&LineOptions::default(), SerializableColor::black())),
        }
    }

    fn rect_entry(canvas: u32, subregion: u32) -> ObjectEntry {
        ObjectEntry {
            core: ObjectCore::new(
                ObjectId::new(),
                ObjectKind::Rectangle,
                CanvasId(canvas),
                SubregionId(subregion),
                Affine::IDENTITY,
            ),
            object: Object::Rectangle(Rectangle::new(
                &RectangleOptions::default(),
                SerializableColor::black(),
            )),
        }
    }

    #[test]
    fn test_register_unregister() {
        let mut registry = Registry::new();
        let a = registry.register(line_entry(0, 0));
        let b = registry.register(rect_entry(0, 0));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.instances_of(ObjectKind::Line).len(), 1);
        assert!(registry.instances_of(ObjectKind::Cursor).is_empty());
        assert_eq!(registry.ordered(), &[a, b]);

        assert!(registry.unregister(a).is_some());
        assert!(registry.unregister(a).is_none());
        assert!(!registry.contains(a));
        assert!(registry.instances_of(ObjectKind::Line).is_empty());
        assert_eq!(registry.all_instances(), HashSet::from([b]));
    }

    #[test]
    fn test_peers_scopes() {
        let mut registry = Registry::new();
        let a = registry.register(line_entry(0, 0));
        let b = registry.register(line_entry(0, 0));
        let c = registry.register(line_entry(0, 1));
        let d = registry.register(line_entry(1, 2));
        let _r = registry.register(rect_entry(0, 0));

        assert_eq!(registry.peers(a, Scope::SameSubregion), vec![b]);
        assert_eq!(registry.peers(a, Scope::SameCanvas), vec![b, c]);
        assert_eq!(registry.peers(a, Scope::All), vec![b, c, d]);
        assert!(registry.peers(ObjectId::new(), Scope::All).is_empty());
    }

    #[test]
    fn test_on_canvas() {
        let mut registry = Registry::new();
        let a = registry.register(line_entry(0, 0));
        registry.register(line_entry(1, 2));
        let c = registry.register(rect_entry(0, 1));
        assert_eq!(registry.on_canvas(CanvasId(0)), vec![a, c]);
        assert_eq!(registry.in_subregion(SubregionId(1)), vec![c]);
    }
}
