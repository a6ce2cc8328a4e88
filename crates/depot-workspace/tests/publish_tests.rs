//! The publish flow: transfer to the remote store, register in the
//! global artifact space, pin in the source set.

use depot_artifacts::{transfer, FsRegistry, FsStore, RemoteSourceSet, RemoteStore, SourceSet};
use depot_core::{Artifact, Dependencies, Error, Package, BUILDFILE_NAME};
use depot_workspace::{init_workspace, CacheStore};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    workspace: PathBuf,
    registry: FsRegistry,
    store: FsStore,
}

fn fixture_with_package(name: &str) -> Fixture {
    let temp = TempDir::new().unwrap();
    let registry = FsRegistry::new(temp.path().join("registry"), "main");
    let store = FsStore::new(temp.path().join("store"));
    registry.setup().unwrap();
    store.setup().unwrap();

    let workspace = temp.path().join("ws");
    fs::create_dir_all(&workspace).unwrap();
    init_workspace(&workspace, &registry, &store).unwrap();

    let dir = workspace.join(name);
    fs::create_dir_all(dir.join("build/src")).unwrap();
    fs::write(
        dir.join(BUILDFILE_NAME),
        format!("namespace: acme\nname: {name}\nversion: \"1.0\"\ntype: go\n"),
    )
    .unwrap();
    fs::write(dir.join("build/src/code.file"), format!("{name} build")).unwrap();

    Fixture {
        _temp: temp,
        workspace,
        registry,
        store,
    }
}

fn artifact(name: &str, build_number: &str) -> Artifact {
    Artifact::new(
        Package {
            namespace: "acme".to_string(),
            name: name.to_string(),
            version: "1.0".to_string(),
            kind: "go".to_string(),
            dependencies: Dependencies::default(),
        },
        build_number,
    )
}

fn publish(fixture: &Fixture, artifact: &Artifact) -> depot_core::Result<()> {
    let local = CacheStore::for_workspace(&fixture.workspace)?;
    transfer(&local, &fixture.store, artifact)?;
    fixture.registry.register_artifact(artifact)?;
    fixture.registry.use_artifact(artifact)
}

#[test]
fn test_publish_then_read_back() {
    let fixture = fixture_with_package("lib");
    let a = artifact("lib", "7");
    publish(&fixture, &a).unwrap();

    // The pin now resolves to the published artifact, and the store
    // holds its bytes under the blob key.
    assert_eq!(
        fixture.registry.get_artifact("acme", "lib", "1.0").unwrap(),
        a
    );
    assert!(fixture
        ._temp
        .path()
        .join("store/acme/lib/1.0/7")
        .is_file());
}

#[test]
fn test_sequential_publishes_move_the_pin() {
    let fixture = fixture_with_package("lib");
    let first = artifact("lib", "7");
    let second = artifact("lib", "8");

    publish(&fixture, &first).unwrap();
    publish(&fixture, &second).unwrap();

    // The pin follows the latest publish; the earlier build stays in the
    // global space, unpinned but still pinnable.
    let pinned = fixture.registry.get_artifact("acme", "lib", "1.0").unwrap();
    assert_eq!(pinned.build_number, "8");

    fixture.registry.use_artifact(&first).unwrap();
    assert_eq!(
        fixture
            .registry
            .get_artifact("acme", "lib", "1.0")
            .unwrap()
            .build_number,
        "7"
    );
}

#[test]
fn test_republishing_same_build_number_fails() {
    let fixture = fixture_with_package("lib");
    let a = artifact("lib", "7");
    publish(&fixture, &a).unwrap();

    // The store refuses the duplicate before any registry write happens.
    let result = publish(&fixture, &a);
    assert!(matches!(result, Err(Error::ArtifactExists { .. })));

    assert_eq!(
        fixture.registry.get_artifact("acme", "lib", "1.0").unwrap(),
        a
    );
}

#[test]
fn test_registry_snapshot_lists_each_pin_once() {
    let fixture = fixture_with_package("lib");
    publish(&fixture, &artifact("lib", "7")).unwrap();
    publish(&fixture, &artifact("lib", "8")).unwrap();

    let all = fixture.registry.get_all_artifacts().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].build_number, "8");
}
