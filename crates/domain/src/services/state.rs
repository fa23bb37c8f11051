//! In-memory application state of the console.
//!
//! The state holds the last known geofences and nodes plus a normalized
//! index from geofence id to its assignments. The index is filled by a full
//! load and then kept current by applying each successful mutation.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{ActivationHour, Assignment, AssignmentAction, Geofence, Node};

/// Effect of applying a mutation to the local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// The state was modified.
    Changed,
    /// The state already reflected the mutation.
    Unchanged,
    /// The mutation referenced an assignment the state does not know.
    Missing,
}

impl StateChange {
    pub fn is_changed(self) -> bool {
        matches!(self, StateChange::Changed)
    }
}

/// Geofence id → assignments, kept sorted by device id.
#[derive(Debug, Clone, Default)]
pub struct AssignmentIndex {
    by_geofence: BTreeMap<i64, Vec<Assignment>>,
}

impl AssignmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the assignments of one geofence with a freshly fetched list.
    ///
    /// Records are stamped with `geofence_id` since the backend may omit it.
    pub fn replace(&mut self, geofence_id: i64, assignments: Vec<Assignment>) {
        let mut assignments: Vec<Assignment> = assignments
            .into_iter()
            .map(|mut a| {
                a.polygon_id = geofence_id;
                a
            })
            .collect();
        assignments.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        assignments.dedup_by(|a, b| a.device_id == b.device_id);

        if assignments.is_empty() {
            self.by_geofence.remove(&geofence_id);
        } else {
            self.by_geofence.insert(geofence_id, assignments);
        }
    }

    /// Records a new assignment. Existing pairs are left untouched.
    pub fn insert(&mut self, assignment: Assignment) -> StateChange {
        let list = self.by_geofence.entry(assignment.polygon_id).or_default();
        match list.binary_search_by(|a| a.device_id.cmp(&assignment.device_id)) {
            Ok(_) => StateChange::Unchanged,
            Err(pos) => {
                list.insert(pos, assignment);
                StateChange::Changed
            }
        }
    }

    /// Applies an update-assignment action to the matching pair.
    ///
    /// Activate and deactivate always record the activation hour sent along.
    /// Whether the pair changed depends on the active flag alone.
    pub fn apply(
        &mut self,
        geofence_id: i64,
        device_id: &str,
        action: AssignmentAction,
        hour: ActivationHour,
    ) -> StateChange {
        let Some(list) = self.by_geofence.get_mut(&geofence_id) else {
            return StateChange::Missing;
        };
        let Ok(pos) = list.binary_search_by(|a| a.device_id.as_str().cmp(device_id)) else {
            return StateChange::Missing;
        };

        let change = match action {
            AssignmentAction::Activate | AssignmentAction::Deactivate => {
                let active = action == AssignmentAction::Activate;
                let assignment = &mut list[pos];
                assignment.hour = Some(hour);
                if assignment.active == active {
                    StateChange::Unchanged
                } else {
                    assignment.active = active;
                    StateChange::Changed
                }
            }
            AssignmentAction::Delete => {
                list.remove(pos);
                StateChange::Changed
            }
        };

        if list.is_empty() {
            self.by_geofence.remove(&geofence_id);
        }

        debug!(geofence_id, device_id, action = %action, %hour, ?change, "Assignment index updated");
        change
    }

    /// Drops every assignment of a geofence.
    pub fn remove_geofence(&mut self, geofence_id: i64) {
        self.by_geofence.remove(&geofence_id);
    }

    /// Assignments of a geofence, sorted by device id.
    pub fn for_geofence(&self, geofence_id: i64) -> &[Assignment] {
        self.by_geofence
            .get(&geofence_id)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, geofence_id: i64, device_id: &str) -> Option<&Assignment> {
        self.for_geofence(geofence_id)
            .iter()
            .find(|a| a.device_id == device_id)
    }

    /// A geofence is assigned iff at least one assignment references it.
    pub fn is_assigned(&self, geofence_id: i64) -> bool {
        !self.for_geofence(geofence_id).is_empty()
    }

    /// Total number of assignments across all geofences.
    pub fn len(&self) -> usize {
        self.by_geofence.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_geofence.is_empty()
    }
}

/// Everything the console knows within one session.
#[derive(Debug, Clone, Default)]
pub struct ConsoleState {
    pub geofences: Vec<Geofence>,
    pub nodes: Vec<Node>,
    pub assignments: AssignmentIndex,
    pub selected: Option<i64>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn geofence(&self, geofence_id: i64) -> Option<&Geofence> {
        self.geofences.iter().find(|g| g.polygon_id == geofence_id)
    }

    pub fn node(&self, device_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.device_id == device_id)
    }

    pub fn is_assigned(&self, geofence_id: i64) -> bool {
        self.assignments.is_assigned(geofence_id)
    }

    /// Replaces the geofence list, dropping assignments and a selection that
    /// reference geofences which no longer exist.
    pub fn set_geofences(&mut self, geofences: Vec<Geofence>) {
        let stale: Vec<i64> = self
            .geofences
            .iter()
            .map(|g| g.polygon_id)
            .filter(|id| !geofences.iter().any(|g| g.polygon_id == *id))
            .collect();
        for id in stale {
            self.assignments.remove_geofence(id);
        }
        if let Some(selected) = self.selected {
            if !geofences.iter().any(|g| g.polygon_id == selected) {
                self.selected = None;
            }
        }
        self.geofences = geofences;
    }

    /// Removes a geofence after the backend confirmed its deletion.
    pub fn remove_geofence(&mut self, geofence_id: i64) -> StateChange {
        let before = self.geofences.len();
        self.geofences.retain(|g| g.polygon_id != geofence_id);
        self.assignments.remove_geofence(geofence_id);
        if self.selected == Some(geofence_id) {
            self.selected = None;
        }
        if self.geofences.len() < before {
            StateChange::Changed
        } else {
            StateChange::Missing
        }
    }

    /// Adds a node unless one with the same id is already known.
    pub fn upsert_node(&mut self, node: Node) -> StateChange {
        match self.nodes.iter_mut().find(|n| n.device_id == node.device_id) {
            Some(existing) if *existing == node => StateChange::Unchanged,
            Some(existing) => {
                *existing = node;
                StateChange::Changed
            }
            None => {
                self.nodes.push(node);
                StateChange::Changed
            }
        }
    }

    /// Nodes not assigned to the geofence, in list order.
    pub fn available_nodes(&self, geofence_id: i64) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| self.assignments.get(geofence_id, &n.device_id).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PolygonGeometry;

    fn geofence(id: i64, name: &str) -> Geofence {
        Geofence {
            polygon_id: id,
            name: name.to_string(),
            geometry: PolygonGeometry::from_ring(vec![[2.0, 48.0]]),
            active: false,
        }
    }

    fn node(id: &str) -> Node {
        Node {
            device_id: id.to_string(),
            name: None,
        }
    }

    fn assignment(device: &str, active: bool) -> Assignment {
        Assignment {
            polygon_id: 0,
            device_id: device.to_string(),
            active,
            hour: None,
        }
    }

    #[test]
    fn test_replace_stamps_geofence_and_sorts() {
        let mut index = AssignmentIndex::new();
        index.replace(7, vec![assignment("b", true), assignment("a", false)]);

        let list = index.for_geofence(7);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].device_id, "a");
        assert!(list.iter().all(|a| a.polygon_id == 7));
        assert!(index.is_assigned(7));
    }

    #[test]
    fn test_replace_with_empty_list_unassigns() {
        let mut index = AssignmentIndex::new();
        index.replace(7, vec![assignment("a", false)]);
        index.replace(7, vec![]);
        assert!(!index.is_assigned(7));
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = AssignmentIndex::new();
        assert_eq!(index.insert(Assignment::pending(1, "dev1")), StateChange::Changed);
        assert_eq!(index.insert(Assignment::pending(1, "dev1")), StateChange::Unchanged);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_apply_deactivate_twice() {
        let mut index = AssignmentIndex::new();
        index.replace(1, vec![assignment("dev1", true)]);

        let hour = ActivationHour::IMMEDIATE;
        let first = index.apply(1, "dev1", AssignmentAction::Deactivate, hour);
        assert_eq!(first, StateChange::Changed);
        assert!(!index.get(1, "dev1").unwrap().active);

        let second = index.apply(1, "dev1", AssignmentAction::Deactivate, hour);
        assert_eq!(second, StateChange::Unchanged);
        assert!(!index.get(1, "dev1").unwrap().active);
    }

    #[test]
    fn test_apply_activate_and_delete() {
        let mut index = AssignmentIndex::new();
        index.insert(Assignment::pending(1, "dev1"));

        let hour = ActivationHour::new(16).unwrap();
        assert!(index
            .apply(1, "dev1", AssignmentAction::Activate, hour)
            .is_changed());
        let stored = index.get(1, "dev1").unwrap();
        assert!(stored.active);
        assert_eq!(stored.hour, Some(hour));

        // same action at another hour only moves the hour
        let later = ActivationHour::new(20).unwrap();
        assert_eq!(
            index.apply(1, "dev1", AssignmentAction::Activate, later),
            StateChange::Unchanged
        );
        assert_eq!(index.get(1, "dev1").unwrap().hour, Some(later));

        assert!(index
            .apply(1, "dev1", AssignmentAction::Delete, ActivationHour::MIDNIGHT)
            .is_changed());
        assert!(index.get(1, "dev1").is_none());
        assert!(!index.is_assigned(1));
    }

    #[test]
    fn test_deactivate_twice_at_different_hours() {
        let mut index = AssignmentIndex::new();
        let mut assignment = Assignment::pending(1, "dev1");
        assignment.active = true;
        index.insert(assignment);

        assert_eq!(
            index.apply(1, "dev1", AssignmentAction::Deactivate, ActivationHour::IMMEDIATE),
            StateChange::Changed
        );
        let ten = ActivationHour::new(10).unwrap();
        assert_eq!(
            index.apply(1, "dev1", AssignmentAction::Deactivate, ten),
            StateChange::Unchanged
        );

        let stored = index.get(1, "dev1").unwrap();
        assert!(!stored.active);
        assert_eq!(stored.hour, Some(ten));
    }

    #[test]
    fn test_apply_unknown_pair() {
        let mut index = AssignmentIndex::new();
        assert_eq!(
            index.apply(1, "dev1", AssignmentAction::Activate, ActivationHour::IMMEDIATE),
            StateChange::Missing
        );
        index.insert(Assignment::pending(1, "dev1"));
        assert_eq!(
            index.apply(1, "dev2", AssignmentAction::Delete, ActivationHour::MIDNIGHT),
            StateChange::Missing
        );
    }

    #[test]
    fn test_set_geofences_drops_stale_entries() {
        let mut state = ConsoleState::new();
        state.set_geofences(vec![geofence(1, "A"), geofence(2, "B")]);
        state.assignments.insert(Assignment::pending(2, "dev1"));
        state.selected = Some(2);

        state.set_geofences(vec![geofence(1, "A")]);
        assert!(!state.is_assigned(2));
        assert_eq!(state.selected, None);
        assert!(state.geofence(2).is_none());
    }

    #[test]
    fn test_remove_geofence() {
        let mut state = ConsoleState::new();
        state.set_geofences(vec![geofence(1, "A")]);
        assert_eq!(state.remove_geofence(1), StateChange::Changed);
        assert_eq!(state.remove_geofence(1), StateChange::Missing);
    }

    #[test]
    fn test_available_nodes_excludes_assigned() {
        let mut state = ConsoleState::new();
        state.nodes = vec![node("dev1"), node("dev2"), node("dev3")];
        state.assignments.insert(Assignment::pending(1, "dev2"));

        let available: Vec<&str> = state
            .available_nodes(1)
            .iter()
            .map(|n| n.device_id.as_str())
            .collect();
        assert_eq!(available, vec!["dev1", "dev3"]);
        assert_eq!(state.available_nodes(2).len(), 3);
    }

    #[test]
    fn test_upsert_node() {
        let mut state = ConsoleState::new();
        assert!(state.upsert_node(node("dev1")).is_changed());
        assert_eq!(state.upsert_node(node("dev1")), StateChange::Unchanged);

        let renamed = Node {
            device_id: "dev1".to_string(),
            name: Some("Van".to_string()),
        };
        assert!(state.upsert_node(renamed).is_changed());
        assert_eq!(state.node("dev1").unwrap().display_name(), "Van");
        assert_eq!(state.nodes.len(), 1);
    }
}
