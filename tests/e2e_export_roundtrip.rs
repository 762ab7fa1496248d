//! Export round-trip: build a family through the maintainer, dump it as
//! JSON, and check the dump carries the whole graph.

use kinship_rs::export::{export_json, snapshot, GraphSnapshot};
use kinship_rs::{EdgeOrigin, Gender, GraphMaintainer, MemoryBackend, MirrorLink, OneWayReason};
use pretty_assertions::assert_eq;

async fn seed_family() -> GraphMaintainer<MemoryBackend> {
    let graph = GraphMaintainer::open_memory();
    let alice = graph.add_person(Some("Alice"), Some(Gender::Female)).await.unwrap();
    let bob = graph.add_person(Some("Bob"), Some(Gender::Male)).await.unwrap();
    let carol = graph.add_person(Some("Carol"), Some(Gender::Female)).await.unwrap();
    let dan = graph.add_person(None, None).await.unwrap();

    graph.assert_relationship(alice, bob, "husband").await.unwrap();
    graph.assert_relationship(bob, carol, "daughter").await.unwrap();
    graph.assert_relationship(bob, alice, "wife").await.unwrap();
    graph.assert_relationship(carol, dan, "mentor").await.unwrap();
    graph
}

#[tokio::test]
async fn test_export_contains_every_edge() {
    let graph = seed_family().await;
    let mut out = Vec::new();
    export_json(graph.backend(), &mut out).await.unwrap();

    let dump: GraphSnapshot = serde_json::from_slice(&out).unwrap();
    assert_eq!(dump.persons.len(), 4);
    // husband/wife collapse into one pair, daughter and mentor are mirrored.
    assert_eq!(dump.relationships.len(), 6);

    let names: Vec<Option<&str>> = dump.persons.iter().map(|p| p.name.as_deref()).collect();
    assert_eq!(names, vec![Some("Alice"), Some("Bob"), Some("Carol"), None]);

    let mut types: Vec<&str> = dump.relationships.iter().map(|r| r.rel_type.as_str()).collect();
    types.sort_unstable();
    assert_eq!(types, vec!["daughter", "father", "husband", "mentor", "mentor", "wife"]);
}

#[tokio::test]
async fn test_export_matches_live_snapshot() {
    let graph = seed_family().await;
    let mut out = Vec::new();
    export_json(graph.backend(), &mut out).await.unwrap();

    let dump: GraphSnapshot = serde_json::from_slice(&out).unwrap();
    assert_eq!(dump, snapshot(graph.backend()).await.unwrap());
}

#[tokio::test]
async fn test_export_is_deterministic() {
    let graph = seed_family().await;
    let mut first = Vec::new();
    let mut second = Vec::new();
    export_json(graph.backend(), &mut first).await.unwrap();
    export_json(graph.backend(), &mut second).await.unwrap();
    assert_eq!(String::from_utf8(first).unwrap(), String::from_utf8(second).unwrap());
}

#[tokio::test]
async fn test_export_records_origins() {
    let graph = GraphMaintainer::open_memory();
    let a = graph.add_person(Some("A"), Some(Gender::Male)).await.unwrap();
    let b = graph.add_person(Some("B"), Some(Gender::Female)).await.unwrap();
    graph.assert_relationship(a, b, "husband").await.unwrap();

    let mut out = Vec::new();
    export_json(graph.backend(), &mut out).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

    let rel = &json["relationships"][0];
    assert_eq!(rel["rel_type"], "husband");
    assert_eq!(rel["origin"]["kind"], "asserted");

    let dump: GraphSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(
        dump.relationships[0].origin,
        EdgeOrigin::Asserted {
            holder_gender: Some(Gender::Male),
            mirror: MirrorLink::OneWay(OneWayReason::NoReciprocalForGender),
        }
    );
}
