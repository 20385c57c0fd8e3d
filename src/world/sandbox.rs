//! In-memory game world implementing every collaborator trait

use serde::{Deserialize, Serialize};

use super::map::CityMap;
use super::{
    CityState, Connection, Ledger, MapQuery, Node, NodeFlags, SecurityMode, TeamPool,
};
use crate::ai::tracker::{RecencyQueue, Traversal};
use crate::core::error::{PlannerError, Result};
use crate::core::types::{ConnectionId, NodeId, SecurityLevel, Side, TeamArc, TeamId};

/// A single Authority team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub arc: TeamArc,
    /// None while in reserve
    pub location: Option<NodeId>,
}

/// Self-contained world: city map, team roster, ledger and city state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sandbox {
    pub map: CityMap,
    pub roster: Vec<Team>,
    pub authority_resources: i32,
    pub resistance_resources: i32,
    pub city_loyalty: i32,
    pub crisis_count: usize,
    pub crisis_modifier: i32,
    pub security_mode: Option<SecurityMode>,
    pub immediate_notice: bool,
    pub authority_stressed: bool,
    pub lobby_available: bool,
    pub stress_leaves: u32,
    pub lobbies: u32,
    next_team: u32,
}

impl Sandbox {
    pub fn new(map: CityMap) -> Self {
        Self {
            map,
            roster: Vec::new(),
            authority_resources: 0,
            resistance_resources: 0,
            city_loyalty: 5,
            crisis_count: 0,
            crisis_modifier: 0,
            security_mode: None,
            immediate_notice: false,
            authority_stressed: false,
            lobby_available: false,
            stress_leaves: 0,
            lobbies: 0,
            next_team: 0,
        }
    }

    /// Add `count` idle teams of every arc
    pub fn with_teams(mut self, count: usize) -> Self {
        for arc in TeamArc::ALL {
            for _ in 0..count {
                self.add_team(arc);
            }
        }
        self
    }

    pub fn with_resources(mut self, authority: i32) -> Self {
        self.authority_resources = authority;
        self
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.map.node_mut(id)
    }

    /// Teams currently on the map
    pub fn deployed(&self) -> impl Iterator<Item = &Team> {
        self.roster.iter().filter(|t| t.location.is_some())
    }

    /// Clear per-turn flags, called by the game loop after a turn completes
    pub fn end_turn(&mut self) {
        self.immediate_notice = false;
        self.crisis_count = 0;
    }
}

impl MapQuery for Sandbox {
    fn node_ids(&self) -> Vec<NodeId> {
        self.map.node_ids()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.map.node(id)
    }

    fn connection_ids(&self) -> Vec<ConnectionId> {
        self.map.connection_ids()
    }

    fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.map.connection(id)
    }

    fn node_connections(&self, id: NodeId) -> Vec<ConnectionId> {
        self.map.node_connections(id)
    }

    fn neighbours(&self, id: NodeId) -> Vec<NodeId> {
        self.map.neighbours(id)
    }

    fn near_neighbours(&self, id: NodeId) -> Vec<NodeId> {
        self.map.near_neighbours(id)
    }

    fn node_activity(&self) -> &RecencyQueue<NodeId> {
        self.map.node_activity()
    }

    fn connection_activity(&self) -> &RecencyQueue<Traversal> {
        self.map.connection_activity()
    }

    fn set_connection_security(&mut self, id: ConnectionId, level: SecurityLevel) -> Result<()> {
        self.map.set_connection_security(id, level)
    }

    fn set_node_flags(&mut self, id: NodeId, flags: NodeFlags) -> Result<()> {
        self.map.set_node_flags(id, flags)
    }
}

impl TeamPool for Sandbox {
    fn idle_count(&self, arc: TeamArc) -> usize {
        self.roster
            .iter()
            .filter(|t| t.arc == arc && t.location.is_none())
            .count()
    }

    fn deployed_count(&self, arc: TeamArc) -> usize {
        self.roster
            .iter()
            .filter(|t| t.arc == arc && t.location.is_some())
            .count()
    }

    fn deploy(&mut self, arc: TeamArc, node: NodeId) -> Result<TeamId> {
        let target = self
            .map
            .node_mut(node)
            .ok_or_else(|| PlannerError::missing_node(node))?;
        let team = self
            .roster
            .iter_mut()
            .find(|t| t.arc == arc && t.location.is_none())
            .ok_or(PlannerError::NoIdleTeam(arc))?;

        team.location = Some(node);
        target.teams.push(arc);
        Ok(team.id)
    }

    fn add_team(&mut self, arc: TeamArc) -> TeamId {
        let id = TeamId(self.next_team);
        self.next_team += 1;
        self.roster.push(Team {
            id,
            arc,
            location: None,
        });
        id
    }
}

impl Ledger for Sandbox {
    fn resources(&self, side: Side) -> i32 {
        match side {
            Side::Authority => self.authority_resources,
            Side::Resistance => self.resistance_resources,
        }
    }

    fn set_resources(&mut self, side: Side, amount: i32) {
        match side {
            Side::Authority => self.authority_resources = amount,
            Side::Resistance => self.resistance_resources = amount,
        }
    }
}

impl CityState for Sandbox {
    fn city_loyalty(&self) -> i32 {
        self.city_loyalty
    }

    fn set_city_loyalty(&mut self, loyalty: i32) {
        self.city_loyalty = loyalty.clamp(0, 10);
    }

    fn crisis_count(&self) -> usize {
        self.crisis_count
    }

    fn crisis_modifier(&self) -> i32 {
        self.crisis_modifier
    }

    fn set_crisis_modifier(&mut self, modifier: i32) {
        self.crisis_modifier = modifier;
    }

    fn security_mode(&self) -> Option<SecurityMode> {
        self.security_mode
    }

    fn declare_security_mode(&mut self, mode: SecurityMode) {
        self.security_mode = Some(mode);
    }

    fn immediate_notice(&self) -> bool {
        self.immediate_notice
    }

    fn authority_stressed(&self) -> bool {
        self.authority_stressed
    }

    fn grant_stress_leave(&mut self) {
        self.authority_stressed = false;
        self.stress_leaves += 1;
    }

    fn lobby_available(&self) -> bool {
        self.lobby_available
    }

    fn lobby_hq(&mut self) {
        self.lobby_available = false;
        self.lobbies += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NodeArc;

    fn two_node_sandbox() -> Sandbox {
        let mut map = CityMap::new(10);
        map.add_node(Node::new(NodeId(0), "A", NodeArc::Sprawl, 3));
        map.add_node(Node::new(NodeId(1), "B", NodeArc::Utility, 3));
        map.connect(NodeId(0), NodeId(1), SecurityLevel::None);
        Sandbox::new(map)
    }

    #[test]
    fn test_deploy_moves_idle_team() {
        let mut sandbox = two_node_sandbox().with_teams(1);
        assert_eq!(sandbox.idle_count(TeamArc::Civil), 1);

        sandbox.deploy(TeamArc::Civil, NodeId(1)).unwrap();

        assert_eq!(sandbox.idle_count(TeamArc::Civil), 0);
        assert_eq!(sandbox.deployed_count(TeamArc::Civil), 1);
        assert!(sandbox.node(NodeId(1)).unwrap().has_team(TeamArc::Civil));
    }

    #[test]
    fn test_deploy_without_idle_team_fails() {
        let mut sandbox = two_node_sandbox();
        let result = sandbox.deploy(TeamArc::Probe, NodeId(0));
        assert!(matches!(result, Err(PlannerError::NoIdleTeam(TeamArc::Probe))));
    }

    #[test]
    fn test_deploy_to_missing_node_fails() {
        let mut sandbox = two_node_sandbox().with_teams(1);
        let result = sandbox.deploy(TeamArc::Civil, NodeId(9));
        assert!(matches!(result, Err(PlannerError::MissingReference { .. })));
        assert_eq!(sandbox.idle_count(TeamArc::Civil), 1);
    }

    #[test]
    fn test_ledger_sides_independent() {
        let mut sandbox = two_node_sandbox().with_resources(4);
        sandbox.set_resources(Side::Resistance, 9);
        assert_eq!(sandbox.resources(Side::Authority), 4);
        assert_eq!(sandbox.resources(Side::Resistance), 9);
    }

    #[test]
    fn test_loyalty_clamped() {
        let mut sandbox = two_node_sandbox();
        sandbox.set_city_loyalty(14);
        assert_eq!(sandbox.city_loyalty(), 10);
        sandbox.set_city_loyalty(-2);
        assert_eq!(sandbox.city_loyalty(), 0);
    }
}
