use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::anyhow;
use snip_archive::LoadedAssembly;
use snip_core::{Type, Value};
use snip_scripting::{
    BindingResolver, CompileOptions, PipelineError, ResolvedBinding, ScriptingConfig,
    ScriptingService, ValueStore,
};

fn service(scratch: &tempfile::TempDir) -> ScriptingService {
    let config = ScriptingConfig::default().with_scratch_dir(scratch.path().join("scratch"));
    ScriptingService::new(config)
}

/// A resolver that always returns `bindings` and counts how often it was called.
fn resolver(bindings: Vec<ResolvedBinding>) -> (impl BindingResolver, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let resolver = move || {
        counter.fetch_add(1, Ordering::SeqCst);
        let bindings = bindings.clone();
        async move { Ok::<_, anyhow::Error>(bindings) }
    };
    (resolver, calls)
}

#[tokio::test]
async fn fragments_without_free_names_compile_once() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let (resolver, calls) = resolver(vec![]);

    let result = service
        .compile(
            "var a = 20;\na * 2 + 2",
            &CompileOptions::in_memory(),
            Some(&resolver),
        )
        .await
        .unwrap();

    assert!(result.success(), "{}", result.diagnostic_text);
    assert!(result.diagnostic_text.is_empty());
    assert_eq!(result.compile_passes, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        result.assembly().unwrap().invoke_entry(&()).unwrap(),
        Value::Int(42)
    );
}

#[tokio::test]
async fn free_names_are_bound_by_the_resolver() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let (resolver, calls) = resolver(vec![ResolvedBinding::with_type("x", Type::Int, 41_i64)]);

    let result = service
        .compile("x + 1", &CompileOptions::in_memory(), Some(&resolver))
        .await
        .unwrap();

    assert!(result.success(), "{}", result.diagnostic_text);
    assert_eq!(result.compile_passes, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.bindings.len(), 1);
    let assembly = result.assembly().unwrap();
    assert_eq!(
        assembly.invoke_entry(&result.bound_values()).unwrap(),
        Value::Int(42)
    );
}

#[tokio::test]
async fn names_the_resolver_does_not_know_stay_errors() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let (resolver, calls) = resolver(vec![ResolvedBinding::new("a", 1_i64)]);

    let result = service
        .compile("a + b", &CompileOptions::in_memory(), Some(&resolver))
        .await
        .unwrap();

    assert!(!result.success());
    assert!(result.artifact.is_none());
    assert_eq!(result.compile_passes, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(result.diagnostic_text.contains("E0103"));
    assert!(result.diagnostic_text.contains("`b`"));
    assert!(!result.diagnostic_text.contains("`a`"));
}

#[tokio::test]
async fn free_names_without_a_resolver_are_a_configuration_error() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);

    let error = service
        .compile("x + 1", &CompileOptions::in_memory(), None)
        .await
        .unwrap_err();
    assert!(matches!(error, PipelineError::MissingResolver));
}

#[tokio::test]
async fn unparseable_fragments_fail_before_resolving() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let (resolver, calls) = resolver(vec![ResolvedBinding::new("x", 1_i64)]);

    let error = service
        .compile("var = ;", &CompileOptions::in_memory(), Some(&resolver))
        .await
        .unwrap_err();
    match error {
        PipelineError::Parse {
            diagnostics,
            rendered,
        } => {
            assert!(!diagnostics.is_empty());
            assert!(rendered.contains("fragment.snip"));
        }
        other => panic!("parse error expected, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deeply_nested_fragments_are_parse_errors() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let (resolver, calls) = resolver(vec![]);
    let depth = 10_000;
    let fragment = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));

    let error = service
        .compile(&fragment, &CompileOptions::in_memory(), Some(&resolver))
        .await
        .unwrap_err();
    match error {
        PipelineError::Parse { rendered, .. } => {
            assert!(rendered.contains("nested too deeply"), "{rendered}");
        }
        other => panic!("parse error expected, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn warnings_fail_the_compile() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let (resolver, calls) = resolver(vec![]);

    let result = service
        .compile(";\n1", &CompileOptions::in_memory(), Some(&resolver))
        .await
        .unwrap();
    assert!(!result.success());
    assert!(result.artifact.is_none());
    assert_eq!(result.compile_passes, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(
        result.diagnostic_text.contains("empty statement"),
        "{}",
        result.diagnostic_text
    );
}

#[tokio::test]
async fn resolver_failures_propagate() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let resolver = || async { Err::<Vec<ResolvedBinding>, _>(anyhow!("host is gone")) };

    let error = service
        .compile("x", &CompileOptions::in_memory(), Some(&resolver))
        .await
        .unwrap_err();
    match error {
        PipelineError::Resolver(cause) => assert_eq!(cause.to_string(), "host is gone"),
        other => panic!("resolver error expected, got {other:?}"),
    }
}

#[tokio::test]
async fn other_errors_fail_without_resolving() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let (resolver, calls) = resolver(vec![]);

    let result = service
        .compile("int a = \"text\";\na", &CompileOptions::in_memory(), Some(&resolver))
        .await
        .unwrap();
    assert!(!result.success());
    assert_eq!(result.compile_passes, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(result.diagnostic_text.contains("E0308"));
}

#[tokio::test]
async fn disk_and_memory_artifacts_behave_the_same() {
    let scratch = tempfile::tempdir().unwrap();
    let scratch_dir = scratch.path().join("scratch");
    assert!(!scratch_dir.exists());
    let service = service(&scratch);
    let store = ValueStore::new();
    store.add("base", 2.5);
    store.add("count", 4_i64);
    let fragment = "var total = 0.0;\nvar i = 0;\nwhile (i < count) { total = total + base; i = i + 1; }\ntotal";

    let in_memory = service
        .compile(fragment, &CompileOptions::in_memory(), Some(&store))
        .await
        .unwrap();
    let first = service
        .compile(fragment, &CompileOptions::disk(), Some(&store))
        .await
        .unwrap();
    let second = service
        .compile(fragment, &CompileOptions::disk(), Some(&store))
        .await
        .unwrap();

    let (first, second) = (first.path().unwrap(), second.path().unwrap());
    assert!(first.starts_with(&scratch_dir));
    assert_ne!(first, second);
    assert_eq!(first.extension().unwrap(), "sar");

    let from_disk = LoadedAssembly::load_file(first, &service.references().snapshot()).unwrap();
    let expected = in_memory.assembly().unwrap().invoke_entry(&store).unwrap();
    assert_eq!(expected, Value::Float(10.0));
    assert_eq!(from_disk.invoke_entry(&store).unwrap(), expected);
}

#[tokio::test]
async fn value_store_supplies_bindings_and_values() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(&scratch);
    let store = ValueStore::new();
    store.add("greeting", "hello");
    store.add("name", "world");

    let result = service
        .compile(
            "greeting + \", \" + name",
            &CompileOptions::in_memory(),
            Some(&store),
        )
        .await
        .unwrap();
    assert!(result.success(), "{}", result.diagnostic_text);

    let assembly = result.assembly().unwrap();
    assert_eq!(
        assembly.invoke_entry(&store).unwrap(),
        Value::from("hello, world")
    );
    store.add("name", "there");
    assert_eq!(
        assembly.invoke_entry(&store).unwrap(),
        Value::from("hello, there")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn compiles_can_run_concurrently() {
    let scratch = tempfile::tempdir().unwrap();
    let service = Arc::new(service(&scratch));

    let tasks: Vec<_> = (0..4_i64)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let (resolver, _) = resolver(vec![ResolvedBinding::new("n", i)]);
                let result = service
                    .compile("n * n", &CompileOptions::disk(), Some(&resolver))
                    .await
                    .unwrap();
                result.path().unwrap().to_owned()
            })
        })
        .collect();

    let mut paths = vec![];
    for task in tasks {
        paths.push(task.await.unwrap());
    }
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 4);
}
