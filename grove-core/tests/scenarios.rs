use glam::Vec3;
use grove_core::{
    Config, GenealogyDocument, Grove, LoadError, Person, Snapshot, StructuralError,
    prominence,
};
use std::sync::Arc;

fn lone() -> GenealogyDocument {
    GenealogyDocument::new("A").person(Person::new("A", "Alpha"))
}

fn pair() -> GenealogyDocument {
    GenealogyDocument::new("A")
        .person(Person::new("A", "Alpha").with_children(["B", "C"]))
        .person(Person::new("B", "Bravo"))
        .person(Person::new("C", "Charlie"))
}

fn trio() -> GenealogyDocument {
    GenealogyDocument::new("A")
        .person(Person::new("A", "Alpha").with_children(["B", "C", "D"]))
        .person(Person::new("B", "Bravo"))
        .person(Person::new("C", "Charlie"))
        .person(Person::new("D", "Delta"))
}

#[test]
fn lone_person_is_one_tapered_tube() {
    let snap = Snapshot::build(lone(), &Config::default()).unwrap();
    let sk = snap.skeleton();
    assert_eq!(sk.len(), 1);
    assert!(sk.joints.is_empty());
    let seg = sk.root().unwrap();
    assert!(seg.end_radius < seg.start_radius);
    assert_eq!(snap.index().len(), 1);
    assert!(!snap.mesh().is_empty());
    assert!(snap.mesh().seams.is_empty());

    // Aimed well to the side of the trunk.
    assert!(snap.pick(Vec3::new(50.0, 1.0, 0.0), Vec3::Z).is_none());
}

#[test]
fn two_children_split_symmetrically() {
    let snap = Snapshot::build(pair(), &Config::default()).unwrap();
    let sk = snap.skeleton();
    assert_eq!(sk.joints.len(), 1);
    let joint = &sk.joints[0];
    let angles: Vec<f32> = joint.branches.iter().map(|b| joint.branch_angle(b)).collect();
    assert!((angles[0] + angles[1]).abs() < 1e-4);
    assert!(angles[0] > 0.0);

    let seam = &snap.mesh().seams[0];
    assert_eq!(seam.branches.len(), 2);
}

#[test]
fn three_children_fan_in_order() {
    let cfg = Config::default();
    let snap = Snapshot::build(trio(), &cfg).unwrap();
    let sk = snap.skeleton();
    assert_eq!(sk.joints.len(), 1);
    let joint = &sk.joints[0];

    let people: Vec<&str> = joint
        .branches
        .iter()
        .map(|b| sk.segments[b.segment].person_id.as_str())
        .collect();
    assert_eq!(people, ["B", "C", "D"]);

    let first = joint.branch_angle(&joint.branches[0]);
    let last = joint.branch_angle(&joint.branches[2]);
    assert!(((first - last) - cfg.growth.fan_spread).abs() < 1e-4);
    assert!(first > 0.0 && last < 0.0);
}

#[test]
fn invalid_child_is_rejected_and_previous_tree_kept() {
    let mut grove = Grove::default();
    let before = grove.load(trio()).unwrap();

    let broken = GenealogyDocument::new("A")
        .person(Person::new("A", "Alpha").with_children(["B", "Z"]))
        .person(Person::new("B", "Bravo"));
    match grove.load(broken) {
        Err(StructuralError::DanglingChild { parent, child }) => {
            assert_eq!(parent, "A");
            assert_eq!(child, "Z");
        }
        other => panic!("expected a dangling child, got {other:?}"),
    }
    assert!(Arc::ptr_eq(&before, &grove.snapshot().unwrap()));
    assert_eq!(grove.snapshot().unwrap().skeleton().len(), 4);
}

#[test]
fn cycles_and_second_parents_are_rejected() {
    let cycle = r#"{
        "root": "a",
        "people": [
            { "id": "a", "name": "A", "children": ["b"] },
            { "id": "b", "name": "B", "children": ["c"] },
            { "id": "c", "name": "C", "children": ["b"] }
        ]
    }"#;
    let mut grove = Grove::default();
    let err = grove.load_json(cycle).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Structure(
            StructuralError::Cycle { .. } | StructuralError::DuplicateParent { .. }
        )
    ));
    assert!(grove.snapshot().is_none());
}

#[test]
fn every_person_gets_one_segment() {
    let doc = GenealogyDocument {
        people: trio()
            .people
            .into_iter()
            .map(|p| {
                if p.id == "D" {
                    p.with_children(["E"])
                } else {
                    p
                }
            })
            .chain([Person::new("E", "Echo")])
            .collect(),
        ..trio()
    };
    let snap = Snapshot::build(doc, &Config::default()).unwrap();
    assert_eq!(snap.genealogy().len(), 5);
    assert_eq!(snap.skeleton().len(), 5);
    assert_eq!(snap.index().len(), 5);
}

#[test]
fn person_outside_the_lineage_is_rejected_and_previous_tree_kept() {
    let mut grove = Grove::default();
    let before = grove.load(pair()).unwrap();

    let separate = lone().person(Person::new("Z", "Zulu"));
    match grove.load(separate) {
        Err(StructuralError::Unreachable { root, ids }) => {
            assert_eq!(root, "A");
            assert_eq!(ids, ["Z"]);
        }
        other => panic!("expected an unreachable person, got {other:?}"),
    }
    assert!(Arc::ptr_eq(&before, &grove.snapshot().unwrap()));
}

#[test]
fn identical_input_is_bit_identical() {
    let cfg = Config::default();
    let a = Snapshot::build(trio(), &cfg).unwrap();
    let b = Snapshot::build(trio(), &cfg).unwrap();
    assert_eq!(a.mesh().vertex_bytes(), b.mesh().vertex_bytes());
    assert_eq!(a.mesh().index_bytes(), b.mesh().index_bytes());

    for seg in &a.skeleton().segments {
        let side = seg.direction().any_orthonormal_vector();
        let origin = seg.midpoint() + side * 30.0;
        assert_eq!(a.pick(origin, -side), b.pick(origin, -side));
    }
}

#[test]
fn midpoint_pick_returns_owner() {
    let snap = Snapshot::build(trio(), &Config::default()).unwrap();
    for seg in &snap.skeleton().segments {
        let side = seg.direction().any_orthonormal_vector();
        assert_eq!(snap.pick(seg.midpoint(), side), Some(seg.person_id.as_str()));
    }
}

#[test]
fn prominence_is_monotonic_in_biography() {
    let cfg = Config::default().prominence;
    let short = prominence::derive(&Person::new("x", "X").with_biography("brief"), 2, &cfg);
    let long = prominence::derive(
        &Person::new("x", "X").with_biography("word ".repeat(200)),
        2,
        &cfg,
    );
    assert!(long.glow_intensity > short.glow_intensity);
    assert!(long.branch_thickness > short.branch_thickness);
    assert!(long.luminance > short.luminance);
    assert!(long.color_vibrancy > short.color_vibrancy);
}

#[test]
fn json_config_overrides_and_sanitizes() {
    let cfg = Config::from_json(
        r#"{ "mesh": { "radial_segments": 1000 }, "growth": { "seed": 9 } }"#,
    )
    .unwrap();
    assert_eq!(cfg.growth.seed, 9);
    let snap = Snapshot::build(lone(), &cfg).unwrap();
    assert_eq!(snap.config().mesh.radial_segments, 64);
    assert_eq!(snap.config().growth.base_length, Config::default().growth.base_length);
}

#[test]
fn info_reports_lifespan_text() {
    let doc = GenealogyDocument::new("A")
        .person(
            Person::new("A", "Alpha")
                .with_years(Some(1990), None)
                .with_children(["B"]),
        )
        .person(Person::new("B", "Bravo").with_years(None, Some(1980)));
    let mut grove = Grove::default();
    grove.load(doc).unwrap();
    assert_eq!(grove.info("A").unwrap().lifespan.to_string(), "1990 - present");
    assert_eq!(grove.info("B").unwrap().lifespan.to_string(), "? - 1980");
    let json = serde_json::to_string(&grove.info("A").unwrap()).unwrap();
    assert!(json.contains("\"Alpha\""));
}
