use std::path::{Path, PathBuf};

use indoc::indoc;
use snip_core::Value;
use snip_scripting::{CompileOptions, ScriptingConfig, ScriptingService};

const MATH: &str = indoc! {"
    namespace Lib;

    class Math {
        static int Square(int x) { return x * x; }
        static float Half(float x) { return x / 2; }
    }
"};

fn build_library(dir: &Path, name: &str, source: &str) -> PathBuf {
    let output = dir.join(format!("{name}.sar"));
    let result = ScriptingService::default()
        .compile_library(name, source, &output)
        .unwrap();
    assert!(result.success(), "{}", result.diagnostic_text);
    output
}

fn service(dir: &Path) -> ScriptingService {
    ScriptingService::new(ScriptingConfig::default().with_scratch_dir(dir.join("scratch")))
}

#[test]
fn adding_the_same_library_twice_keeps_one_reference() {
    let dir = tempfile::tempdir().unwrap();
    let math = build_library(dir.path(), "math", MATH);
    let service = service(dir.path());

    assert!(service.references().add_path(&math));
    assert!(service.references().add_path(&math));
    assert!(service
        .references()
        .add_path(dir.path().join(".").join("math.sar")));
    assert_eq!(service.references().len(), 1);
}

#[test]
fn concurrent_adds_of_one_library_keep_one_reference() {
    let dir = tempfile::tempdir().unwrap();
    let math = build_library(dir.path(), "math", MATH);
    let service = service(dir.path());
    let references = service.references();

    let added: Vec<bool> = std::thread::scope(|scope| {
        let threads: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| references.add_path(&math)))
            .collect();
        threads
            .into_iter()
            .map(|thread| thread.join().unwrap())
            .collect()
    });

    assert_eq!(added.len(), 16);
    assert!(added.iter().all(|&added| added));
    assert_eq!(references.len(), 1);
}

#[test]
fn missing_and_malformed_libraries_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(dir.path());

    assert!(!service.references().add_path(dir.path().join("nowhere.sar")));

    let garbage = dir.path().join("garbage.sar");
    std::fs::write(&garbage, b"this is not an archive").unwrap();
    assert!(!service.references().add_path(&garbage));
    assert!(service.references().is_empty());
}

#[test]
fn the_search_root_is_searched_for_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("reference-assemblies");
    std::fs::create_dir_all(&root).unwrap();
    build_library(&root, "math", MATH);

    let service = ScriptingService::new(
        ScriptingConfig::default()
            .with_scratch_dir(dir.path().join("scratch"))
            .with_search_root(&root),
    );
    assert!(service.references().add_path("does/not/exist/math.sar"));
    assert_eq!(
        service.references().paths(),
        [root.join("math.sar").canonicalize().unwrap()]
    );
}

#[test]
fn libraries_are_referenced_through_their_types() {
    let dir = tempfile::tempdir().unwrap();
    let math = build_library(dir.path(), "math", MATH);
    let loaded = snip_archive::LoadedAssembly::load_file(&math, &[]).unwrap();
    let class = loaded.class("Math").unwrap();
    assert_eq!(class.full_name(), "Lib.Math");

    let service = service(dir.path());
    assert!(service.references().add_type(&class));
    assert!(service.references().add_path(&math));
    assert_eq!(service.references().len(), 1);

    let in_memory = snip_archive::LoadedAssembly::load(&std::fs::read(&math).unwrap(), &[]).unwrap();
    assert!(!service
        .references()
        .add_type(&in_memory.class("Math").unwrap()));
}

#[tokio::test]
async fn fragments_call_into_referenced_libraries() {
    let dir = tempfile::tempdir().unwrap();
    let math = build_library(dir.path(), "math", MATH);
    let service = service(dir.path());

    let before = service
        .compile("Math.Square(7)", &CompileOptions::in_memory(), None)
        .await
        .unwrap();
    assert!(!before.success());
    assert!(before.diagnostic_text.contains("E0246"));

    assert!(service.references().add_path(&math));
    let after = service
        .compile("Math.Square(7) + Math.Half(3)", &CompileOptions::in_memory(), None)
        .await
        .unwrap();
    assert!(after.success(), "{}", after.diagnostic_text);
    assert_eq!(
        after.assembly().unwrap().invoke_entry(&()).unwrap(),
        Value::Float(50.5)
    );
}

#[test]
fn libraries_can_depend_on_libraries() {
    let dir = tempfile::tempdir().unwrap();
    let math = build_library(dir.path(), "math", MATH);

    let base = service(dir.path());
    assert!(base.references().add_path(&math));
    let output = dir.path().join("geometry.sar");
    let result = base
        .compile_library(
            "geometry",
            "class Geometry { static int Area(int side) { return Math.Square(side); } }",
            &output,
        )
        .unwrap();
    assert!(result.success(), "{}", result.diagnostic_text);

    let service = service(dir.path());
    assert!(!service.references().add_path(&output));
    assert!(service.references().add_path(&math));
    assert!(service.references().add_path(&output));
    assert_eq!(service.references().len(), 2);
}
