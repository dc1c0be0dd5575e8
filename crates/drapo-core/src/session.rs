//! Motion session: leader election and the moving set of one drag.

use crate::registry::ObjectId;

/// Phase of a motion session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No drag in progress.
    #[default]
    Idle,
    /// A press elected a leader; no motion yet.
    LeaderElected,
    /// At least one motion event was processed.
    Dragging,
}

/// The objects moving together during one drag on a canvas.
///
/// The moving set is non-empty only while a session is active, and a leader
/// is set exactly when it is.
#[derive(Debug, Clone, Default)]
pub struct MotionSession {
    phase: Phase,
    leader: Option<ObjectId>,
    followers: Vec<ObjectId>,
}

impl MotionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn leader(&self) -> Option<ObjectId> {
        self.leader
    }

    pub fn followers(&self) -> &[ObjectId] {
        &self.followers
    }

    /// Elect `id` as leader. Fails if a session is already running.
    pub fn elect(&mut self, id: ObjectId) -> bool {
        if self.is_active() {
            return false;
        }
        self.phase = Phase::LeaderElected;
        self.leader = Some(id);
        self.followers.clear();
        true
    }

    /// Add `id` to the moving set. No-op without a leader.
    pub fn add_follower(&mut self, id: ObjectId) {
        if self.is_active() && self.leader != Some(id) && !self.followers.contains(&id) {
            self.followers.push(id);
        }
    }

    /// First motion event of the drag.
    pub fn start_dragging(&mut self) {
        if self.phase == Phase::LeaderElected {
            self.phase = Phase::Dragging;
        }
    }

    /// Leader first, then followers.
    pub fn members(&self) -> Vec<ObjectId> {
        self.leader.iter().chain(self.followers.iter()).copied().collect()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.leader == Some(id) || self.followers.contains(&id)
    }

    /// End the session; returns the members that were moving.
    pub fn resolve(&mut self) -> Vec<ObjectId> {
        let members = self.members();
        self.phase = Phase::Idle;
        self.leader = None;
        self.followers.clear();
        members
    }
}
