use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::SeedableRng;

use rovsim::as_graph::NetworkGraph;
use rovsim::as_graph_generators::load_relationships;
use rovsim::prefix::Prefix;
use rovsim::shared::{HopDirection, PathShape, UsageError};
use rovsim::simulation_engine::{PropagationOptions, RovSelection};

fn prefix() -> Prefix {
    Prefix::parse("10.0.0.0/24").unwrap()
}

fn graph_from(records: &str) -> NetworkGraph {
    load_relationships(records.as_bytes()).unwrap()
}

/// Two tier-1 peers (1, 2), each with a transit customer (3, 4), each of
/// which has two stubs (5, 6 under 3; 7, 8 under 4). Stub 6 is multihomed
/// to 4 as well.
fn create_test_internet() -> NetworkGraph {
    graph_from(
        "1|2|0\n\
         1|3|-1\n\
         2|4|-1\n\
         3|5|-1\n\
         3|6|-1\n\
         4|6|-1\n\
         4|7|-1\n\
         4|8|-1\n",
    )
}

fn path_at(graph: &NetworkGraph, asn: u32) -> Option<Vec<u32>> {
    graph
        .get(&asn)
        .and_then(|node| node.rib.get(&prefix()))
        .map(|route| route.as_path.clone())
}

#[test]
fn test_fixture_customer_route_reaches_peer() {
    // AS1 is a customer of AS2, which peers with AS3
    let mut graph = graph_from("2|1|-1\n2|3|0\n");
    assert!(graph.originate(1, prefix(), false));
    let not_reached = graph.propagate(1, false);

    assert_eq!(path_at(&graph, 2), Some(vec![2, 1]));
    assert_eq!(path_at(&graph, 3), Some(vec![3, 2, 1]));
    // Nobody hands the route back to its origin
    assert_eq!(path_at(&graph, 1), None);
    assert_eq!(not_reached, BTreeSet::from([1]));
}

#[test]
fn test_fixture_provider_route_stays_off_peers() {
    // AS1 is the provider of AS2: AS2 may not hand the route to its peer
    let mut graph = graph_from("1|2|-1\n2|3|0\n");
    graph.originate(1, prefix(), false);
    let not_reached = graph.propagate(1, false);

    assert_eq!(path_at(&graph, 2), Some(vec![2, 1]));
    assert_eq!(path_at(&graph, 3), None);
    assert_eq!(not_reached, BTreeSet::from([1, 3]));
}

#[test]
fn test_full_propagation_prefers_customers_then_short_paths() {
    let mut graph = create_test_internet();
    graph.originate(6, prefix(), false);
    graph.propagate(6, false);

    assert_eq!(path_at(&graph, 3), Some(vec![3, 6]));
    assert_eq!(path_at(&graph, 4), Some(vec![4, 6]));
    assert_eq!(path_at(&graph, 1), Some(vec![1, 3, 6]));
    assert_eq!(path_at(&graph, 2), Some(vec![2, 4, 6]));
    assert_eq!(path_at(&graph, 5), Some(vec![5, 3, 6]));
    assert_eq!(path_at(&graph, 7), Some(vec![7, 4, 6]));
}

#[test]
fn test_no_installed_path_contains_a_loop() {
    let mut graph = create_test_internet();
    graph.add_sibling(5, 7).unwrap();
    graph.add_peering(3, 4);
    graph.originate(5, prefix(), false);
    graph.originate(8, Prefix::parse("10.8.0.0/16").unwrap(), false);
    graph.propagate_all();

    for node in graph.iter() {
        for route in node.rib.values() {
            assert_eq!(route.as_path[0], node.asn);
            let mut seen = BTreeSet::new();
            assert!(
                route.as_path.iter().all(|asn| seen.insert(*asn)),
                "AS{} holds a looping path {:?}",
                node.asn,
                route.as_path
            );
        }
    }
}

#[test]
fn test_rov_filters_invalid_origin() {
    let mut graph = create_test_internet();
    graph.originate(5, prefix(), true);
    graph
        .enable_rov(&RovSelection::Asns(vec![1, 3]))
        .unwrap();
    graph.propagate(5, false);
    assert_eq!(path_at(&graph, 3), Some(vec![3, 5]));

    let mut hijacked = graph.snapshot();
    hijacked.inject_hijack(8, prefix(), vec![]);
    hijacked.propagate(8, true);

    // AS4 has no ROV and prefers its customer's route
    assert_eq!(path_at(&hijacked, 4), Some(vec![4, 8]));
    assert!(hijacked.get(&4).unwrap().rib[&prefix()].hijack);
    // AS1 and AS3 keep the legitimate route
    assert_eq!(path_at(&hijacked, 3), Some(vec![3, 5]));
    assert_eq!(path_at(&hijacked, 1), Some(vec![1, 3, 5]));

    let exposed = hijacked.check_hijack_exposure();
    assert!(exposed.contains(&4));
    assert!(exposed.contains(&2));
    assert!(!exposed.contains(&1));
    assert!(!exposed.contains(&3));
}

#[test]
fn test_rov_without_roa_rejects_everything() {
    let mut graph = create_test_internet();
    graph.enable_rov(&RovSelection::Asns(vec![3])).unwrap();
    graph.originate(5, prefix(), false);
    graph.propagate(5, false);
    assert_eq!(path_at(&graph, 3), None);
}

#[test]
fn test_forged_origin_passes_rov() {
    let mut graph = create_test_internet();
    graph.originate(5, prefix(), true);
    graph.enable_rov(&RovSelection::Asns(vec![2, 4])).unwrap();
    graph.propagate(5, false);

    let mut hijacked = graph.snapshot();
    hijacked.inject_hijack(8, prefix(), vec![5]);
    hijacked.propagate(8, true);

    // The forged path ends in the victim, so ROV sees a valid origin
    assert_eq!(path_at(&hijacked, 4), Some(vec![4, 8, 5]));
    assert!(hijacked.get(&4).unwrap().rib[&prefix()].hijack);
}

#[test]
fn test_enable_rov_modes() {
    let mut graph = create_test_internet();
    let mut rng = StdRng::seed_from_u64(3);
    let enabled = graph
        .enable_rov_with_rng(&RovSelection::Percentage(50.0), &mut rng)
        .unwrap();
    assert_eq!(enabled, 4);
    assert_eq!(graph.iter().filter(|n| n.rov_enabled).count(), 4);

    let mut graph = create_test_internet();
    let enabled = graph
        .enable_rov(&RovSelection::Asns(vec![1, 99]))
        .unwrap();
    assert_eq!(enabled, 1);
    assert_eq!(graph.rov_asns, vec![1, 99]);

    assert_eq!(
        graph.enable_rov(&RovSelection::Percentage(0.0)),
        Err(UsageError::InvalidPercentage(0.0))
    );
    assert_eq!(
        RovSelection::from_parts(None, None),
        Err(UsageError::RovSelectionConflict)
    );
}

#[test]
fn test_type1_hijack_loses_to_shorter_customer_route() {
    let mut graph = create_test_internet();
    graph.originate(6, prefix(), false);
    graph.propagate(6, false);

    let mut hijacked = graph.snapshot();
    hijacked.inject_hijack(5, prefix(), vec![6]);
    hijacked.propagate(5, true);

    assert!(hijacked.get(&6).unwrap().rib.is_empty());
    // AS3 compares two customer routes: [3, 6] stays, [3, 5, 6] is longer
    assert_eq!(path_at(&hijacked, 3), Some(vec![3, 6]));
    let record = hijacked.last_hijack_announce.clone().unwrap();
    assert_eq!(record.origin, 5);
    assert_eq!(record.as_path, vec![5, 6]);
}

#[test]
fn test_vantage_points() {
    let mut graph = create_test_internet();
    graph.get_mut(&1).unwrap().set_vantage_point(200_000);
    graph.get_mut(&4).unwrap().set_vantage_point(10);
    graph.get_mut(&2).unwrap().set_vantage_point(10);

    graph.originate(5, prefix(), false);
    graph.propagate(5, false);
    let mut hijacked = graph.snapshot();
    hijacked.inject_hijack(7, prefix(), vec![]);
    hijacked.propagate(7, true);

    let exposed = hijacked.check_hijack_exposure();
    assert!(exposed.contains(&4));
    assert!(hijacked.hijack_checked);
    // AS4 learned it from a customer; AS2 learned it from a customer too
    assert!(hijacked.vantage_points_hijacked.contains(&4));
    assert!(hijacked.vantage_points_hijacked.contains(&2));
    // AS1 keeps the customer route to the victim
    assert!(!exposed.contains(&1));

    let paths = hijacked.export_hijacked_paths(&hijacked.vantage_points_hijacked);
    let at_two = paths.iter().find(|p| p.asn == 2).unwrap();
    assert_eq!(at_two.as_path, vec![2, 4, 7]);
    assert_eq!(at_two.shape, PathShape::Up);
}

#[test]
fn test_partial_vantage_point_ignores_provider_routes() {
    let mut graph = create_test_internet();
    graph.get_mut(&8).unwrap().set_vantage_point(10);
    graph.originate(5, prefix(), false);
    graph.propagate(5, false);
    let mut hijacked = graph.snapshot();
    hijacked.inject_hijack(7, prefix(), vec![]);
    hijacked.propagate(7, true);

    let exposed = hijacked.check_hijack_exposure_with(100_000);
    assert!(exposed.contains(&8));
    assert!(!hijacked.vantage_points_hijacked.contains(&8));
}

#[test]
fn test_repair_gives_every_node_a_route() {
    // AS2 learns from its provider and cannot pass the route to peer 3;
    // AS3 is reachable only through the repair pass
    let mut graph = graph_from("1|2|-1\n2|3|0\n3|4|-1\n");
    graph.originate(1, prefix(), false);
    let options = PropagationOptions::new().with_repair(true);
    graph.propagate_with(1, false, &options);

    assert_eq!(path_at(&graph, 3), Some(vec![3, 2, 1]));
    assert_eq!(path_at(&graph, 4), Some(vec![4, 3, 2, 1]));
    assert_eq!(path_at(&graph, 1), None);
    assert_eq!(graph.policy_violations, BTreeSet::from([3, 4]));
}

#[test]
fn test_repair_flags_forced_routes_until_replaced() {
    let mut graph = graph_from("1|2|-1\n2|3|0\n3|4|-1\n");
    graph.originate(1, prefix(), false);
    let options = PropagationOptions::new().with_repair(true);
    graph.propagate_with(1, false, &options);

    // Every neighbor route of the victim already contains it
    assert_eq!(path_at(&graph, 1), None);
    assert!(!graph.get(&2).unwrap().has_forced_route());
    assert_eq!(graph.forced_route_holders(), BTreeSet::from([3, 4]));

    let mut hijacked = graph.snapshot();
    hijacked.inject_hijack(4, prefix(), vec![]);
    hijacked.propagate_with(4, true, &options);

    // AS3 now prefers the customer route over its forced peer route
    let at_three = &hijacked.get(&3).unwrap().rib[&prefix()];
    assert_eq!(at_three.as_path, vec![3, 4]);
    assert!(at_three.hijack);
    assert!(!at_three.forced);

    // The victim only hears of its prefix through the repair
    let at_one = &hijacked.get(&1).unwrap().rib[&prefix()];
    assert_eq!(at_one.as_path, vec![1, 2, 3, 4]);
    assert!(at_one.hijack);
    assert!(at_one.forced);

    assert_eq!(hijacked.forced_route_holders(), BTreeSet::from([1, 4]));
    assert_eq!(hijacked.policy_violations, BTreeSet::from([1, 3, 4]));
}

#[test]
fn test_repair_prefers_providers_then_ascending_asn() {
    let mut graph = NetworkGraph::new();
    graph.add_provider_customer(20, 9);
    graph.add_peering(9, 30);
    graph.add_provider_customer(9, 5);
    for asn in [20, 30, 5] {
        graph.add_provider_customer(asn, 77);
        graph
            .get_mut(&asn)
            .unwrap()
            .evaluate_route(&[prefix()], &[77], false, true);
    }

    // AS77 only has neighbors whose paths already contain it
    let forced = graph.repair_partial_visibility(&[prefix()]);
    assert_eq!(forced, BTreeSet::from([9]));
    assert_eq!(path_at(&graph, 9), Some(vec![9, 20, 77]));
}

#[test]
fn test_origin_prepend() {
    let mut graph = create_test_internet();
    graph.originate(6, prefix(), false);
    let options = PropagationOptions::new().with_origin_prepend(BTreeMap::from([(3, 2)]));
    graph.propagate_with(6, false, &options);

    assert_eq!(path_at(&graph, 3), Some(vec![3, 6, 6, 6]));
    assert_eq!(path_at(&graph, 4), Some(vec![4, 6]));
    // AS5 only hears of it through AS3
    assert_eq!(path_at(&graph, 5), Some(vec![5, 3, 6, 6, 6]));
    let classified = graph.classify_path(&[5, 3, 6, 6, 6]);
    assert_eq!(classified.shape, PathShape::UpDown);
    assert_eq!(classified.hops, vec![HopDirection::Down, HopDirection::Up]);
}

#[test]
fn test_propagate_without_prefixes_reaches_nobody() {
    let mut graph = create_test_internet();
    let not_reached = graph.propagate(5, true);
    assert_eq!(not_reached.len(), graph.len());
    assert!(graph.last_hijack_announce.unwrap().prefixes.is_empty());

    let mut graph = create_test_internet();
    assert_eq!(graph.propagate(404, false).len(), 8);
}

#[test]
fn test_classify_paths() {
    // AS2 is a customer of both AS1 and AS3
    let graph = graph_from("1|2|-1\n3|2|-1\n1|4|0\n4|5|-1\n");

    let valley = graph.classify_path(&[1, 2, 3]);
    assert_eq!(valley.shape, PathShape::ValleyViolation);
    assert_eq!(valley.hops, vec![HopDirection::Up, HopDirection::Down]);

    let up = graph.classify_path(&[1, 2]);
    assert_eq!(up.shape, PathShape::Up);

    let up_peer_down = graph.classify_path(&[5, 4, 1, 2]);
    assert_eq!(up_peer_down.shape, PathShape::UpPeerDown);
    assert_eq!(
        up_peer_down.hops,
        vec![HopDirection::Down, HopDirection::Peer, HopDirection::Up]
    );

    assert_eq!(graph.classify_path(&[4, 1]).shape, PathShape::Peer);
    assert_eq!(graph.classify_path(&[2, 1]).shape, PathShape::Down);
    assert_eq!(graph.classify_path(&[1, 99]).shape, PathShape::Unknown);
    assert_eq!(graph.classify_path(&[5, 4, 1]).shape, PathShape::PeerDown);
}

#[test]
fn test_up_down_path() {
    // AS2 is the provider of AS1 and AS3: [3, 2, 1] goes up then down
    let graph = graph_from("2|1|-1\n2|3|-1\n");
    let classified = graph.classify_path(&[3, 2, 1]);
    assert_eq!(classified.shape, PathShape::UpDown);
}
