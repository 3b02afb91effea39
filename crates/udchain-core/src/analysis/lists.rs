use super::location::MemLocation;
use super::state::StateId;
use crate::register::Register;
use crate::tree::{Tree, TreeNode};
use std::collections::BTreeMap;

/// Exact ("must") facts: one value tree per register, last writer wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefList {
    list: BTreeMap<Register, Tree>,
}

impl DefList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, reg: Register, tree: Tree) {
        self.list.insert(reg, tree);
    }

    pub fn get(&self, reg: Register) -> Option<&Tree> {
        self.list.get(&reg)
    }

    pub fn del(&mut self, reg: Register) {
        self.list.remove(&reg);
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, &Tree)> {
        self.list.iter().map(|(reg, tree)| (*reg, tree))
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl std::fmt::Display for DefList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (reg, tree) in &self.list {
            write!(f, "[{}] {} ", reg, tree)?;
        }
        Ok(())
    }
}

/// Approximate ("may") facts: the states whose write to a register may
/// still be live. Origins are kept in insertion order without duplicates;
/// the value they stand for is only resolved once the analysis converges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefList {
    list: BTreeMap<Register, Vec<StateId>>,
}

impl RefList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, reg: Register, origin: StateId) {
        self.list.insert(reg, vec![origin]);
    }

    pub fn add(&mut self, reg: Register, origin: StateId) {
        let origins = self.list.entry(reg).or_default();
        if !origins.contains(&origin) {
            origins.push(origin);
        }
    }

    /// Adds `origin` only when `reg` already has at least one origin.
    pub fn add_if_exist(&mut self, reg: Register, origin: StateId) -> bool {
        match self.list.get_mut(&reg) {
            Some(origins) if !origins.is_empty() => {
                if !origins.contains(&origin) {
                    origins.push(origin);
                }
                true
            }
            _ => false,
        }
    }

    pub fn add_list(&mut self, other: &RefList) {
        for (reg, origins) in &other.list {
            for origin in origins {
                self.add(*reg, *origin);
            }
        }
    }

    pub fn del(&mut self, reg: Register) {
        self.list.remove(&reg);
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn get(&self, reg: Register) -> Option<&[StateId]> {
        self.list.get(&reg).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, &[StateId])> {
        self.list.iter().map(|(reg, origins)| (*reg, origins.as_slice()))
    }

    pub fn count(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl std::fmt::Display for RefList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (reg, origins) in &self.list {
            write!(f, "[{}]", reg)?;
            for origin in origins {
                write!(f, " {}", origin)?;
            }
            write!(f, " ")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemOrigin {
    pub place: Tree,
    pub origin: StateId,
}

impl MemOrigin {
    pub fn location(&self) -> MemLocation<'_> {
        MemLocation::new(&self.place)
    }
}

/// Memory origins keyed by address tree. Places are compared through their
/// canonical [`MemLocation`], so the list is scanned rather than indexed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemOriginList {
    list: Vec<MemOrigin>,
}

impl MemOriginList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, place: &Tree, origin: StateId) {
        self.del(place);
        self.add(place, origin);
    }

    pub fn add(&mut self, place: &Tree, origin: StateId) {
        let location = MemLocation::new(place);
        let exists = self
            .list
            .iter()
            .any(|m| {
                m.origin == origin
                    && (TreeNode::equal(&m.place, place) || m.location() == location)
            });
        if !exists {
            self.list.push(MemOrigin {
                place: place.clone(),
                origin,
            });
        }
    }

    pub fn add_if_exist(&mut self, place: &Tree, origin: StateId) -> bool {
        let location = MemLocation::new(place);
        if self.list.iter().any(|m| m.location() == location) {
            self.add(place, origin);
            true
        } else {
            false
        }
    }

    pub fn add_list(&mut self, other: &MemOriginList) {
        for m in &other.list {
            self.add(&m.place, m.origin);
        }
    }

    /// Removes every entry whose place canonicalizes to the same location.
    pub fn del(&mut self, place: &Tree) {
        let location = MemLocation::new(place);
        self.list.retain(|m| m.location() != location);
    }

    /// Removes every entry addressed relative to `reg`. Once `reg` holds a new
    /// value those places no longer name the slots that were written.
    pub fn del_based_on(&mut self, reg: Register) -> usize {
        let before = self.list.len();
        self.list
            .retain(|m| m.location().base().and_then(TreeNode::as_register) != Some(reg));
        before - self.list.len()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn get(&self, place: &Tree) -> Vec<StateId> {
        let location = MemLocation::new(place);
        self.list
            .iter()
            .filter(|m| m.location() == location)
            .map(|m| m.origin)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemOrigin> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl std::fmt::Display for MemOriginList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for m in &self.list {
            write!(f, "[{}] {} ", m.place, m.origin)?;
        }
        Ok(())
    }
}
