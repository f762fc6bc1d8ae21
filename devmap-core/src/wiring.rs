//! Committed connection state of a project
//!
//! Maps each `(project device, consume connection)` slot to the provide
//! connection serving it, together with the pin claims that assignment holds on
//! the provider's physical pins. Conflicts are decided from the claims alone:
//! two slots may hold the same physical pin only when both use it in the same
//! shareable role.
//!
//! A staged copy ([`Wiring::staged`]) journals every change so the search in
//! [`assignment`](crate::assignment) can roll back to a checkpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::project::ProjectDeviceId;
use crate::topology::PinRole;

/// Use of one physical pin by one assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinClaim {
    /// Physical pin name on the provider
    pub pin: String,
    /// Role the pin is used in
    pub role: PinRole,
}

impl PinClaim {
    /// Create a claim
    pub fn new(pin: impl Into<String>, role: PinRole) -> Self {
        Self { pin: pin.into(), role }
    }

    fn conflicts_with(&self, other: &PinClaim) -> bool {
        self.pin == other.pin
            && !(self.role == other.role && self.role.is_shareable())
    }
}

/// Device offering a provide connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// The project's controller
    Controller,
    /// A project device bound to a part with provide connections
    Device(ProjectDeviceId),
}

/// A provide connection on a specific owner
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProvideRef {
    /// Device offering the connection
    pub owner: Owner,
    /// Provide connection name
    pub connection: String,
}

impl ProvideRef {
    /// Create a reference
    pub fn new(owner: Owner, connection: impl Into<String>) -> Self {
        Self { owner, connection: connection.into() }
    }
}

/// Committed provide connection of one consume slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Serving provide connection
    pub provide: ProvideRef,
    /// Pins held on the provider
    pub claims: Vec<PinClaim>,
}

type Slot = (ProjectDeviceId, String);

#[derive(Debug, Clone, PartialEq)]
enum JournalEntry {
    Set(Slot, Option<Assignment>),
    Unset(Slot, Assignment),
}

/// Connection map of a project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wiring {
    assignments: BTreeMap<Slot, Assignment>,
    journal: Option<Vec<JournalEntry>>,
}

impl Wiring {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Journaled scratch copy for search
    pub fn staged(&self) -> Self {
        Self { assignments: self.assignments.clone(), journal: Some(Vec::new()) }
    }

    /// Drop the journal, keeping the assignments
    pub fn into_committed(self) -> Self {
        Self { assignments: self.assignments, journal: None }
    }

    /// Current journal position
    pub fn checkpoint(&self) -> usize {
        self.journal.as_ref().map_or(0, Vec::len)
    }

    /// Undo every change after `checkpoint`
    pub fn rollback_to(&mut self, checkpoint: usize) {
        let Some(journal) = self.journal.as_mut() else { return };
        while journal.len() > checkpoint {
            match journal.pop() {
                Some(JournalEntry::Set(slot, Some(previous))) => {
                    self.assignments.insert(slot, previous);
                }
                Some(JournalEntry::Set(slot, None)) => {
                    self.assignments.remove(&slot);
                }
                Some(JournalEntry::Unset(slot, previous)) => {
                    self.assignments.insert(slot, previous);
                }
                None => break,
            }
        }
    }

    /// Assignment of one slot
    pub fn assignment(&self, device: ProjectDeviceId, consume: &str) -> Option<&Assignment> {
        self.assignments.get(&(device, consume.to_string()))
    }

    /// Every committed slot
    pub fn assignments(&self) -> impl Iterator<Item = (ProjectDeviceId, &str, &Assignment)> {
        self.assignments.iter().map(|((device, consume), a)| (*device, consume.as_str(), a))
    }

    /// Committed slots of one consumer
    pub fn assignments_of(
        &self,
        device: ProjectDeviceId,
    ) -> impl Iterator<Item = (&str, &Assignment)> {
        self.assignments
            .iter()
            .filter(move |((d, _), _)| *d == device)
            .map(|((_, consume), a)| (consume.as_str(), a))
    }

    /// Number of committed slots
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Nothing committed
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of slots served by `provide`
    pub fn consumer_count(&self, provide: &ProvideRef) -> usize {
        self.assignments.values().filter(|a| &a.provide == provide).count()
    }

    /// Like [`Wiring::consumer_count`], ignoring every slot of `device`
    pub fn consumers_outside(&self, device: ProjectDeviceId, provide: &ProvideRef) -> usize {
        self.assignments
            .iter()
            .filter(|((d, _), a)| *d != device && &a.provide == provide)
            .count()
    }

    /// At least one slot of `consumer` is served by `provider`
    pub fn is_connected(&self, consumer: ProjectDeviceId, provider: Owner) -> bool {
        self.assignments
            .iter()
            .any(|((d, _), a)| *d == consumer && a.provide.owner == provider)
    }

    /// First pin of `claims` on `owner` that another slot holds incompatibly
    pub fn conflict<'c>(
        &self,
        slot: (ProjectDeviceId, &str),
        owner: Owner,
        claims: &'c [PinClaim],
    ) -> Option<&'c str> {
        self.first_conflict(|d, c| !(d == slot.0 && c == slot.1), owner, claims)
    }

    /// Like [`Wiring::conflict`], ignoring every slot of `device`
    pub fn conflict_outside<'c>(
        &self,
        device: ProjectDeviceId,
        owner: Owner,
        claims: &'c [PinClaim],
    ) -> Option<&'c str> {
        self.first_conflict(|d, _| d != device, owner, claims)
    }

    fn first_conflict<'c>(
        &self,
        counts: impl Fn(ProjectDeviceId, &str) -> bool,
        owner: Owner,
        claims: &'c [PinClaim],
    ) -> Option<&'c str> {
        let others = self
            .assignments
            .iter()
            .filter(|((d, c), a)| a.provide.owner == owner && counts(*d, c.as_str()));
        for (_, existing) in others {
            for claim in claims {
                if existing.claims.iter().any(|held| held.conflicts_with(claim)) {
                    return Some(&claim.pin);
                }
            }
        }
        None
    }

    /// Record an assignment, returning the one it replaced
    pub(crate) fn set(
        &mut self,
        device: ProjectDeviceId,
        consume: &str,
        assignment: Assignment,
    ) -> Option<Assignment> {
        let slot = (device, consume.to_string());
        let previous = self.assignments.insert(slot.clone(), assignment);
        if let Some(journal) = self.journal.as_mut() {
            journal.push(JournalEntry::Set(slot, previous.clone()));
        }
        previous
    }

    /// Release one slot
    pub(crate) fn unset(&mut self, device: ProjectDeviceId, consume: &str) -> Option<Assignment> {
        let slot = (device, consume.to_string());
        let previous = self.assignments.remove(&slot)?;
        if let Some(journal) = self.journal.as_mut() {
            journal.push(JournalEntry::Unset(slot, previous.clone()));
        }
        Some(previous)
    }

    /// Release every slot of `device` and every slot served by it
    pub(crate) fn release_device(&mut self, device: ProjectDeviceId) -> usize {
        let doomed: Vec<Slot> = self
            .assignments
            .iter()
            .filter(|((d, _), a)| *d == device || a.provide.owner == Owner::Device(device))
            .map(|(slot, _)| slot.clone())
            .collect();
        for (d, consume) in &doomed {
            self.unset(*d, consume);
        }
        doomed.len()
    }

    /// Release everything
    pub(crate) fn clear(&mut self) {
        let slots: Vec<Slot> = self.assignments.keys().cloned().collect();
        for (d, consume) in &slots {
            self.unset(*d, consume);
        }
    }
}
