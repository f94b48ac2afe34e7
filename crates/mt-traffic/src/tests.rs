//! Unit tests for mt-traffic.

#[cfg(test)]
pub(crate) mod helpers {
    use mt_core::{GeoPoint, NodeId, TravelMode};
    use mt_network::{RoadNetwork, RoadNetworkBuilder};

    /// A plus-shaped crossing: centre C with arms N, S, E, W (two-way drive).
    /// Arms are 70 m long, so every edge has capacity 10.
    pub fn crossing() -> (RoadNetwork, NodeId, [NodeId; 4]) {
        let mut b = RoadNetworkBuilder::new();
        let c = b.add_node(GeoPoint::new(0.0, 0.0));
        let n = b.add_node(GeoPoint::new(0.001, 0.0));
        let s = b.add_node(GeoPoint::new(-0.001, 0.0));
        let e = b.add_node(GeoPoint::new(0.0, 0.001));
        let w = b.add_node(GeoPoint::new(0.0, -0.001));
        for arm in [n, s, e, w] {
            b.add_road(c, arm, 70.0, TravelMode::Drive);
        }
        (b.build(), c, [n, s, e, w])
    }

    /// A→B with capacity 1.
    pub fn single_lane() -> RoadNetwork {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(GeoPoint::new(0.0, 0.0));
        let bb = b.add_node(GeoPoint::new(0.0, 0.0001));
        b.add_edge(a, bb, 5.0, TravelMode::Drive);
        b.build()
    }
}

// ── Congestion ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod congestion {
    use mt_core::{EdgeId, Tick, TravelMode};
    use crate::{congestion_penalty, Admission, CongestionTracker, TrafficError};

    #[test]
    fn penalty_is_monotonic_and_bounded() {
        assert_eq!(congestion_penalty(0.0), 1.0);
        assert_eq!(congestion_penalty(1.0), 3.0);
        assert_eq!(congestion_penalty(5.0), 3.0);
        let mut last = 0.0;
        for i in 0..=10 {
            let p = congestion_penalty(i as f32 / 10.0);
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn capacity_one_refuses_second_entry() {
        let net = super::helpers::single_lane();
        let mut t = CongestionTracker::new(&net, 5).unwrap();
        let e = EdgeId(0);
        assert_eq!(t.capacity(e), 1);
        assert_eq!(t.enter(e, 1), Admission::Admitted);
        assert_eq!(t.enter(e, 1), Admission::Refused);
        assert_eq!(t.occupancy(e), 1);
        assert_eq!(t.refusals(), 1);
        t.leave(e, 1);
        assert!(t.enter(e, 1).is_admitted());
    }

    #[test]
    fn footprint_counts_against_capacity() {
        let (net, c, [n, ..]) = super::helpers::crossing();
        let e = net.find_edge(c, n, TravelMode::Drive).unwrap();
        let mut t = CongestionTracker::new(&net, 5).unwrap();
        for _ in 0..3 {
            assert!(t.enter(e, 3).is_admitted());
        }
        assert_eq!(t.occupancy(e), 9);
        assert_eq!(t.enter(e, 3), Admission::Refused);
        assert!(t.enter(e, 1).is_admitted());
        assert!(t.within_capacity());
        assert_eq!(t.total_occupancy(), 10);
    }

    #[test]
    fn oversized_footprint_fits_an_empty_edge() {
        let net = super::helpers::single_lane();
        let mut t = CongestionTracker::new(&net, 5).unwrap();
        assert!(t.enter(EdgeId(0), 3).is_admitted());
        assert_eq!(t.occupancy(EdgeId(0)), 1);
        t.leave(EdgeId(0), 3);
        assert_eq!(t.occupancy(EdgeId(0)), 0);
    }

    #[test]
    fn snapshot_lags_live_occupancy() {
        let net = super::helpers::single_lane();
        let mut t = CongestionTracker::new(&net, 5).unwrap();
        let e = EdgeId(0);
        t.enter(e, 1);
        assert!(t.should_sample(Tick(5)));
        assert!(!t.should_sample(Tick(7)));
        t.sample(Tick(5));
        t.leave(e, 1);
        // Tick 7: live occupancy is 0, the snapshot still says 1.
        assert_eq!(t.occupancy(e), 0);
        assert_eq!(t.snapshot().occupancy(e), 1);
        assert_eq!(t.snapshot().tick(), Tick(5));
        assert_eq!(t.multipliers(), vec![3.0]);
    }

    #[test]
    fn zero_interval_rejected() {
        let net = super::helpers::single_lane();
        assert!(matches!(
            CongestionTracker::new(&net, 0),
            Err(TrafficError::ZeroSampleInterval)
        ));
    }
}

// ── Traffic lights ────────────────────────────────────────────────────────────

#[cfg(test)]
mod lights {
    use mt_core::{Axis, NodeId, Tick};
    use crate::{Phase, TrafficError, TrafficLightController};

    #[test]
    fn period_ten_alternates() {
        let mut ctl = TrafficLightController::new();
        let node = NodeId(0);
        ctl.install(node, 10).unwrap();
        let mut seen = Vec::new();
        for t in 1..=20 {
            ctl.update(Tick(t));
            seen.push(ctl.phase(node).unwrap());
        }
        assert_eq!(seen[8], Phase::AllowNorthSouth); // tick 9
        assert_eq!(seen[9], Phase::AllowEastWest); // tick 10
        assert_eq!(seen[19], Phase::AllowNorthSouth); // tick 20
        assert_eq!(ctl.phase_at(node, Tick(0)), Some(Phase::AllowNorthSouth));
        assert_eq!(ctl.phase_at(node, Tick(10)), Some(Phase::AllowEastWest));
        assert_eq!(ctl.phase_at(node, Tick(20)), Some(Phase::AllowNorthSouth));
    }

    #[test]
    fn one_toggle_per_period_and_stepped_matches_closed_form() {
        let mut ctl = TrafficLightController::new();
        ctl.install(NodeId(3), 7).unwrap();
        for t in 1..=70u64 {
            let toggled = ctl.update(Tick(t));
            assert_eq!(toggled, usize::from(t % 7 == 0));
            assert_eq!(ctl.phase(NodeId(3)), ctl.phase_at(NodeId(3), Tick(t)));
        }
        assert_eq!(ctl.toggles(), 10);
        let light = ctl.light(NodeId(3)).unwrap();
        assert_eq!(light.last_toggle, Tick(70));
        // Full cycle is two periods.
        for t in 0..50u64 {
            assert_eq!(light.phase_at(Tick(t)), light.phase_at(Tick(t + 14)));
        }
    }

    #[test]
    fn allows_matches_axis() {
        let mut ctl = TrafficLightController::new();
        ctl.install(NodeId(1), 5).unwrap();
        assert!(ctl.allows(NodeId(1), Axis::NorthSouth));
        assert!(!ctl.allows(NodeId(1), Axis::EastWest));
        assert!(ctl.allows(NodeId(2), Axis::EastWest), "uncontrolled node");
        ctl.update(Tick(5));
        assert!(ctl.allows(NodeId(1), Axis::EastWest));
    }

    #[test]
    fn auto_place_picks_intersections() {
        let (net, c, _) = super::helpers::crossing();
        let mut ctl = TrafficLightController::new();
        assert_eq!(ctl.auto_place(&net, 15).unwrap(), 1);
        assert!(ctl.light(c).is_some());
    }

    #[test]
    fn install_replaces_and_validates() {
        let mut ctl = TrafficLightController::new();
        ctl.install(NodeId(0), 10).unwrap();
        ctl.install(NodeId(0), 4).unwrap();
        assert_eq!(ctl.len(), 1);
        assert_eq!(ctl.light(NodeId(0)).unwrap().toggle_period, 4);
        assert!(matches!(
            ctl.install(NodeId(0), 0),
            Err(TrafficError::ZeroTogglePeriod { .. })
        ));
    }
}

// ── Barriers ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod barrier {
    use mt_core::{BlockTarget, EdgeId, GeoPoint, NodeId, Tick, TravelMode};
    use mt_network::{BarrierTarget, EdgeWeights, NetworkError};
    use crate::{BarrierChange, BarrierManager, TrafficError};

    #[test]
    fn block_and_unblock_flip_weights() {
        let (net, c, [n, ..]) = super::helpers::crossing();
        let mut w = EdgeWeights::new(&net);
        let mut mgr = BarrierManager::new();
        let e = net.find_edge(c, n, TravelMode::Drive).unwrap();

        let t = mgr.block(&net, &mut w, BlockTarget::Edge(e), Tick(3)).unwrap();
        assert_eq!(t, BarrierTarget::Edge(e));
        assert!(mgr.is_blocked(t));
        assert!(w.edge_cost(&net, e).is_infinite());

        mgr.unblock(&net, &mut w, BlockTarget::Edge(e), Tick(8)).unwrap();
        assert!(!mgr.is_blocked(t));
        assert!(w.edge_cost(&net, e).is_finite());
        let record = mgr.history()[0];
        assert_eq!(record.activated_at, Tick(3));
        assert_eq!(record.deactivated_at, Some(Tick(8)));
        assert!(!record.active);
    }

    #[test]
    fn coordinates_snap_to_nearest_node() {
        let (net, c, _) = super::helpers::crossing();
        let mut w = EdgeWeights::new(&net);
        let mut mgr = BarrierManager::new();
        let t = mgr
            .block(&net, &mut w, BlockTarget::NearestNode(GeoPoint::new(0.0001, 0.0)), Tick(1))
            .unwrap();
        assert_eq!(t, BarrierTarget::Node(c));
        assert_eq!(mgr.blockages().count(), 1);
    }

    #[test]
    fn invalid_commands_leave_state_untouched() {
        let (net, c, _) = super::helpers::crossing();
        let mut w = EdgeWeights::new(&net);
        let mut mgr = BarrierManager::new();

        assert!(matches!(
            mgr.block(&net, &mut w, BlockTarget::Node(NodeId(99)), Tick(1)),
            Err(TrafficError::Network(NetworkError::NodeNotFound(_)))
        ));
        assert!(matches!(
            mgr.unblock(&net, &mut w, BlockTarget::Edge(EdgeId(0)), Tick(1)),
            Err(TrafficError::NotBlocked(_))
        ));
        mgr.block(&net, &mut w, BlockTarget::Node(c), Tick(1)).unwrap();
        let epoch = w.epoch();
        assert!(matches!(
            mgr.block(&net, &mut w, BlockTarget::Node(c), Tick(2)),
            Err(TrafficError::AlreadyBlocked(_))
        ));
        assert_eq!(w.epoch(), epoch);
        assert_eq!(mgr.blockages().count(), 1);
    }

    #[test]
    fn scheduled_changes_drain_when_due() {
        let mut mgr = BarrierManager::new();
        mgr.schedule(Tick(10), BarrierChange::Unblock(BlockTarget::Node(NodeId(0))));
        mgr.schedule(Tick(4), BarrierChange::Block(BlockTarget::Node(NodeId(0))));
        assert!(mgr.drain_due(Tick(3)).is_empty());
        assert_eq!(
            mgr.drain_due(Tick(4)),
            vec![BarrierChange::Block(BlockTarget::Node(NodeId(0)))]
        );
        assert_eq!(mgr.scheduled(), 1);
    }
}
