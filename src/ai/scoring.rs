//! Node scoring
//!
//! Quantifies how attractive a node is for a team placement. Scores are
//! additive weighted factors and are only compared within a single turn.

use serde::{Deserialize, Serialize};

use crate::core::config::ScoringConfig;
use crate::core::types::{NodeArc, SecurityLevel, Turn};
use crate::world::{MapQuery, Node, TargetStatus};

/// Which factor set applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreProfile {
    /// Spider placement: every factor, including centre and connection security
    Defensive,
    /// Erasure placement around the best guess of the Resistance location
    Pursuit,
}

/// Scores nodes for one turn
pub struct NodeScorer<'a> {
    weights: &'a ScoringConfig,
    preferred: NodeArc,
    turn: Turn,
}

impl<'a> NodeScorer<'a> {
    pub fn new(weights: &'a ScoringConfig, preferred: NodeArc, turn: Turn) -> Self {
        Self {
            weights,
            preferred,
            turn,
        }
    }

    pub fn score<M: MapQuery + ?Sized>(&self, map: &M, node: &Node, profile: ScoreProfile) -> i32 {
        let w = self.weights;
        let mut score = 0;

        if node.arc == self.preferred {
            score += w.preferred_factor;
        }

        score += w.activity_count_factor * node.activity_count as i32;
        if let Some(last) = node.activity_last_turn {
            let age = self.turn.saturating_sub(last) as i32;
            score += (w.activity_time_factor - age).max(0);
        }

        if profile == ScoreProfile::Defensive {
            if node.flags.centre {
                score += w.centre_factor;
            }
            score += map
                .node_connections(node.id)
                .into_iter()
                .filter_map(|id| map.connection(id))
                .map(|c| self.security_weight(c.security))
                .sum::<i32>();
        }

        if node.flags.most_connected {
            score += w.connected_factor;
        }
        if node.flags.chokepoint {
            score += w.chokepoint_factor;
        }

        if let Some(target) = node.target {
            if target.is_known_live() {
                score += w.target_factor;
            } else if target.status == TargetStatus::Outstanding {
                score -= w.target_factor;
            }
        }

        if node.has_spider() {
            score += if node.spider_known {
                w.spider_factor / 2
            } else {
                w.spider_factor
            };
        }

        score
    }

    fn security_weight(&self, level: SecurityLevel) -> i32 {
        match level {
            SecurityLevel::None => self.weights.security_none_factor,
            SecurityLevel::Low => self.weights.security_low_factor,
            SecurityLevel::Medium => self.weights.security_medium_factor,
            SecurityLevel::High => self.weights.security_high_factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{NodeId, TargetId, TeamArc};
    use crate::world::{CityMap, TargetInfo};

    fn map() -> CityMap {
        let mut map = CityMap::new(10);
        map.add_node(Node::new(NodeId(0), "Hub", NodeArc::Corporate, 3));
        map.add_node(Node::new(NodeId(1), "Slums", NodeArc::Sprawl, 3));
        map.add_node(Node::new(NodeId(2), "Plant", NodeArc::Utility, 3));
        map.connect(NodeId(0), NodeId(1), SecurityLevel::None);
        map.connect(NodeId(0), NodeId(2), SecurityLevel::High);
        map
    }

    #[test]
    fn test_preferred_arc_bonus() {
        let map = map();
        let weights = ScoringConfig::default();
        let scorer = NodeScorer::new(&weights, NodeArc::Sprawl, 1);
        let slums = map.node(NodeId(1)).unwrap();
        let plant = map.node(NodeId(2)).unwrap();
        let diff = scorer.score(&map, slums, ScoreProfile::Pursuit)
            - scorer.score(&map, plant, ScoreProfile::Pursuit);
        assert_eq!(diff, weights.preferred_factor);
    }

    #[test]
    fn test_recency_decays_to_zero() {
        let mut map = map();
        let weights = ScoringConfig::default();
        {
            let node = map.node_mut(NodeId(2)).unwrap();
            node.activity_last_turn = Some(1);
        }
        let node = map.node(NodeId(2)).unwrap().clone();

        let fresh = NodeScorer::new(&weights, NodeArc::Gated, 1);
        assert_eq!(fresh.score(&map, &node, ScoreProfile::Pursuit), weights.activity_time_factor);

        let stale = NodeScorer::new(&weights, NodeArc::Gated, 100);
        assert_eq!(stale.score(&map, &node, ScoreProfile::Pursuit), 0);
    }

    #[test]
    fn test_defensive_sums_connection_security() {
        let map = map();
        let weights = ScoringConfig::default();
        let scorer = NodeScorer::new(&weights, NodeArc::Gated, 1);
        let hub = map.node(NodeId(0)).unwrap();

        let defensive = scorer.score(&map, hub, ScoreProfile::Defensive);
        let pursuit = scorer.score(&map, hub, ScoreProfile::Pursuit);
        let mut expected = weights.security_none_factor + weights.security_high_factor;
        if hub.flags.centre {
            expected += weights.centre_factor;
        }
        assert_eq!(defensive - pursuit, expected);
    }

    #[test]
    fn test_target_and_spider_factors() {
        let mut map = map();
        let weights = ScoringConfig::default();
        {
            let node = map.node_mut(NodeId(1)).unwrap();
            node.target = Some(TargetInfo {
                id: TargetId(1),
                status: TargetStatus::Live,
                known: true,
            });
            node.teams.push(TeamArc::Spider);
            node.spider_known = true;
        }
        {
            let node = map.node_mut(NodeId(2)).unwrap();
            node.target = Some(TargetInfo {
                id: TargetId(2),
                status: TargetStatus::Outstanding,
                known: true,
            });
        }
        let scorer = NodeScorer::new(&weights, NodeArc::Gated, 1);
        let slums = map.node(NodeId(1)).unwrap();
        let plant = map.node(NodeId(2)).unwrap();
        assert_eq!(
            scorer.score(&map, slums, ScoreProfile::Pursuit),
            weights.target_factor + weights.spider_factor / 2
        );
        assert_eq!(
            scorer.score(&map, plant, ScoreProfile::Pursuit),
            -weights.target_factor
        );
    }
}
