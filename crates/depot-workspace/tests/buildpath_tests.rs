//! End-to-end buildpath resolution against a real workspace layout.

use depot_artifacts::{transfer, FsRegistry, FsStore, RemoteSourceSet, RemoteStore};
use depot_core::{Artifact, Dependencies, Error, Package, PackageRef, BUILDFILE_NAME};
use depot_workspace::{
    artifact_cache_dir, init_workspace, refresh_workspace, BuildpathResolver, CacheStore,
    DependencyKind,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    workspace: PathBuf,
    registry: FsRegistry,
    store: FsStore,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let registry = FsRegistry::new(temp.path().join("registry"), "main");
    let store = FsStore::new(temp.path().join("store"));
    registry.setup().unwrap();
    store.setup().unwrap();

    let workspace = temp.path().join("ws");
    fs::create_dir_all(&workspace).unwrap();
    init_workspace(&workspace, &registry, &store).unwrap();

    Fixture {
        _temp: temp,
        workspace,
        registry,
        store,
    }
}

fn buildfile(name: &str, compile: &[&str], test: &[&str]) -> String {
    let mut out = format!("namespace: acme\nname: {name}\nversion: \"1.0\"\ntype: go\n");
    if !compile.is_empty() || !test.is_empty() {
        out.push_str("dependencies:\n");
    }
    for (label, deps) in [("compile", compile), ("test", test)] {
        if deps.is_empty() {
            continue;
        }
        out.push_str(&format!("  {label}:\n"));
        for dep in deps {
            out.push_str(&format!(
                "    - namespace: acme\n      name: {dep}\n      version: \"1.0\"\n"
            ));
        }
    }
    out
}

fn add_override(workspace: &Path, name: &str, compile: &[&str], test: &[&str]) {
    let dir = workspace.join(name);
    fs::create_dir_all(dir.join("build/src")).unwrap();
    fs::write(dir.join(BUILDFILE_NAME), buildfile(name, compile, test)).unwrap();
    fs::write(dir.join("build/src/code.file"), format!("{name} output")).unwrap();
}

fn package(name: &str, compile: &[&str]) -> Package {
    Package {
        namespace: "acme".to_string(),
        name: name.to_string(),
        version: "1.0".to_string(),
        kind: "go".to_string(),
        dependencies: Dependencies {
            compile: compile
                .iter()
                .map(|dep| PackageRef {
                    namespace: "acme".to_string(),
                    name: dep.to_string(),
                    version: "1.0".to_string(),
                })
                .collect(),
            test: Vec::new(),
        },
    }
}

/// Publish `package` into the fixture's registry and store: pack its
/// build output from a scratch workspace, upload, register, and pin.
fn publish(fixture: &Fixture, package: Package, build_number: &str) {
    let temp = TempDir::new().unwrap();
    let source_ws = temp.path().join("publisher");
    fs::create_dir_all(&source_ws).unwrap();
    init_workspace(&source_ws, &fixture.registry, &fixture.store).unwrap();

    let dir = source_ws.join(&package.name);
    fs::create_dir_all(dir.join("build/src")).unwrap();
    let compile: Vec<&str> = package
        .dependencies
        .compile
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    fs::write(
        dir.join(BUILDFILE_NAME),
        buildfile(&package.name, &compile, &[]),
    )
    .unwrap();
    fs::write(
        dir.join("build/src/code.file"),
        format!("{} output", package.name),
    )
    .unwrap();

    let artifact = Artifact::new(package, build_number);
    let local = CacheStore::for_workspace(&source_ws).unwrap();
    transfer(&local, &fixture.store, &artifact).unwrap();
    fixture.registry.register_artifact(&artifact).unwrap();
    fixture.registry.use_artifact(&artifact).unwrap();
}

#[test]
fn test_overrides_only() {
    let fixture = fixture();
    add_override(&fixture.workspace, "lib", &[], &[]);
    add_override(&fixture.workspace, "app", &["lib"], &[]);

    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();
    let paths = resolver
        .buildpath(&package("app", &["lib"]), DependencyKind::Compile)
        .unwrap();

    assert_eq!(
        paths,
        vec![fixture.workspace.join("app"), fixture.workspace.join("lib")]
    );
}

#[test]
fn test_cache_miss_then_cache_hit() {
    let fixture = fixture();
    publish(&fixture, package("lib", &[]), "7");
    refresh_workspace(&fixture.workspace, &fixture.registry).unwrap();
    add_override(&fixture.workspace, "app", &["lib"], &[]);

    let lib_artifact = Artifact::new(package("lib", &[]), "7");
    let cache = artifact_cache_dir(&fixture.workspace, &lib_artifact);
    assert!(!cache.exists());

    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();
    let paths = resolver
        .buildpath(&package("app", &["lib"]), DependencyKind::Compile)
        .unwrap();
    assert_eq!(paths, vec![fixture.workspace.join("app"), cache.clone()]);
    assert_eq!(
        fs::read_to_string(cache.join("src/code.file")).unwrap(),
        "lib output"
    );

    // Second resolve is served from the cache: removing the remote store
    // proves no further remote I/O happens.
    fs::remove_dir_all(fixture._temp.path().join("store")).unwrap();
    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();
    let paths = resolver
        .buildpath(&package("app", &["lib"]), DependencyKind::Compile)
        .unwrap();
    assert_eq!(paths, vec![fixture.workspace.join("app"), cache]);
}

#[test]
fn test_transitive_pinned_dependencies() {
    let fixture = fixture();
    publish(&fixture, package("base", &[]), "5");
    publish(&fixture, package("lib", &["base"]), "6");
    refresh_workspace(&fixture.workspace, &fixture.registry).unwrap();
    add_override(&fixture.workspace, "app", &["lib"], &[]);

    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();
    let paths = resolver
        .buildpath(&package("app", &["lib"]), DependencyKind::Compile)
        .unwrap();

    let lib_cache =
        artifact_cache_dir(&fixture.workspace, &Artifact::new(package("lib", &[]), "6"));
    let base_cache =
        artifact_cache_dir(&fixture.workspace, &Artifact::new(package("base", &[]), "5"));
    assert_eq!(paths, vec![fixture.workspace.join("app"), lib_cache, base_cache]);
}

#[test]
fn test_duplicate_paths_preserved_across_subtrees() {
    let fixture = fixture();
    add_override(&fixture.workspace, "base", &[], &[]);
    add_override(&fixture.workspace, "left", &["base"], &[]);
    add_override(&fixture.workspace, "right", &["base"], &[]);
    add_override(&fixture.workspace, "app", &["left", "right"], &[]);

    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();
    let paths = resolver
        .buildpath(&package("app", &["left", "right"]), DependencyKind::Compile)
        .unwrap();

    // Dependencies are pushed in declaration order and therefore visited
    // last-first; the shared dependency is emitted once per subtree.
    let ws = &fixture.workspace;
    assert_eq!(
        paths,
        vec![
            ws.join("app"),
            ws.join("right"),
            ws.join("base"),
            ws.join("left"),
            ws.join("base"),
        ]
    );
}

#[test]
fn test_test_dependencies_apply_to_root_only() {
    let fixture = fixture();
    add_override(&fixture.workspace, "testkit", &[], &[]);
    add_override(&fixture.workspace, "lib", &[], &["testkit"]);
    add_override(&fixture.workspace, "app", &["lib"], &["testkit"]);

    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();

    let mut root = package("app", &["lib"]);
    root.dependencies.test.push(PackageRef {
        namespace: "acme".to_string(),
        name: "testkit".to_string(),
        version: "1.0".to_string(),
    });

    let paths = resolver.buildpath(&root, DependencyKind::Test).unwrap();
    let ws = &fixture.workspace;
    // testkit appears once, for the root; lib's own test dependency on
    // testkit is not followed.
    assert_eq!(
        paths,
        vec![ws.join("app"), ws.join("testkit"), ws.join("lib")]
    );

    let compile_paths = resolver.buildpath(&root, DependencyKind::Compile).unwrap();
    assert_eq!(compile_paths, vec![ws.join("app"), ws.join("lib")]);
}

#[test]
fn test_cycle_detection() {
    let fixture = fixture();
    add_override(&fixture.workspace, "x", &["y"], &[]);
    add_override(&fixture.workspace, "y", &["z"], &[]);
    add_override(&fixture.workspace, "z", &["x"], &[]);

    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();
    let result = resolver.buildpath(&package("x", &["y"]), DependencyKind::Compile);

    match result {
        Err(Error::DependencyCycle { chain }) => {
            assert_eq!(
                chain,
                "acme/x/1.0 -> acme/y/1.0 -> acme/z/1.0 -> acme/x/1.0"
            );
        }
        other => panic!("expected a dependency cycle, got {other:?}"),
    }
}

#[test]
fn test_self_cycle_detection() {
    let fixture = fixture();
    add_override(&fixture.workspace, "solo", &["solo"], &[]);

    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();
    let result = resolver.buildpath(&package("solo", &["solo"]), DependencyKind::Compile);

    match result {
        Err(Error::DependencyCycle { chain }) => {
            assert_eq!(chain, "acme/solo/1.0 -> acme/solo/1.0");
        }
        other => panic!("expected a dependency cycle, got {other:?}"),
    }
}

#[test]
fn test_unresolvable_dependency_is_fatal() {
    let fixture = fixture();
    add_override(&fixture.workspace, "app", &["ghost"], &[]);

    let resolver = BuildpathResolver::for_workspace(&fixture.workspace).unwrap();
    let result = resolver.buildpath(&package("app", &["ghost"]), DependencyKind::Compile);
    assert!(result.unwrap_err().is_artifact_not_found());
}
