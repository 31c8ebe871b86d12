//! `get-dependency-tree` end to end: scan, flatten, cache.

use std::collections::BTreeSet;
use std::time::Duration;

use codebase_mcp::cache::CacheOptions;
use codebase_mcp::graph::DependencyNode;
use codebase_mcp::server::Server;
use codebase_mcp::test_utils::TestProject;
use codebase_mcp::tools::ToolRegistry;
use serde_json::json;

fn diamond() -> TestProject {
    let project = TestProject::new().unwrap();
    project
        .write("src/index.ts", "import { a } from './a';\nimport { b } from './b.js';\nimport React from 'react';\n")
        .unwrap();
    project.write("src/a.ts", "export { c as a } from './shared/c';\n").unwrap();
    project.write("src/b.ts", "const c = require('./shared/c');\nmodule.exports = c;\n").unwrap();
    project.write("src/shared/c.ts", "export const c = 1;\n").unwrap();
    project
}

async fn dependency_tree(registry: &ToolRegistry, args: serde_json::Value) -> Vec<DependencyNode> {
    let result = registry.call("get-dependency-tree", args).await.unwrap();
    assert!(!result.is_error, "{}", result.content[0].text);
    serde_json::from_str(&result.content[0].text).unwrap()
}

fn parents(ids: &[usize]) -> BTreeSet<usize> {
    ids.iter().copied().collect()
}

#[tokio::test]
async fn test_diamond_is_flattened_once_per_file() {
    codebase_mcp::test_utils::init_test_logging(None);
    let project = diamond();
    let server: Server = project.server().unwrap();

    let nodes =
        dependency_tree(server.registry(), json!({ "filePath": project.arg("src/index.ts") })).await;

    let summary: Vec<(usize, String, BTreeSet<usize>)> =
        nodes.iter().map(|n| (n.id, n.file_path.clone(), n.parents.clone())).collect();
    assert_eq!(
        summary,
        vec![
            (1, project.arg("src/index.ts"), parents(&[])),
            (2, project.arg("src/a.ts"), parents(&[1])),
            (3, project.arg("src/shared/c.ts"), parents(&[1, 2, 4])),
            (4, project.arg("src/b.ts"), parents(&[1])),
        ]
    );
    assert_eq!(nodes[2].content, "export const c = 1;\n");
}

#[tokio::test]
async fn test_cycle_terminates() {
    let project = TestProject::new().unwrap();
    project.write("a.ts", "import './b';\n").unwrap();
    project.write("b.ts", "import './a';\n").unwrap();
    let server = project.server().unwrap();

    let nodes = dependency_tree(server.registry(), json!({ "filePath": project.arg("a.ts") })).await;

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].file_path, project.arg("a.ts"));
    assert_eq!(nodes[1].file_path, project.arg("b.ts"));
    assert_eq!(nodes[1].parents, parents(&[1]));
    assert!(nodes.iter().all(|n| !n.parents.contains(&n.id)));
}

#[tokio::test]
async fn test_stacked_shared_imports_finish_quickly() {
    // index -> a1, b1; each aN and bN imports both aN+1 and bN+1. Without
    // sharing, the last layer is reached along 2^LAYERS paths.
    const LAYERS: usize = 32;
    let project = TestProject::new().unwrap();
    project.write("index.ts", "import './a1';\nimport './b1';\n").unwrap();
    for layer in 1..=LAYERS {
        let imports = if layer < LAYERS {
            format!("import './a{next}';\nimport './b{next}';\n", next = layer + 1)
        } else {
            "export {};\n".to_string()
        };
        project.write(&format!("a{layer}.ts"), &imports).unwrap();
        project.write(&format!("b{layer}.ts"), &imports).unwrap();
    }
    let server = project.server().unwrap();

    let nodes = dependency_tree(server.registry(), json!({ "filePath": project.arg("index.ts") })).await;

    assert_eq!(nodes.len(), 2 * LAYERS + 1);
    let last_layer = [project.arg(&format!("a{LAYERS}.ts")), project.arg(&format!("b{LAYERS}.ts"))];
    let everything_above: BTreeSet<usize> = nodes
        .iter()
        .filter(|n| !last_layer.contains(&n.file_path))
        .map(|n| n.id)
        .collect();
    for node in nodes.iter().filter(|n| last_layer.contains(&n.file_path)) {
        assert_eq!(node.parents, everything_above);
    }
}

#[tokio::test]
async fn test_result_is_cached_until_start_file_changes() {
    let project = diamond();
    let server = project.server().unwrap();
    let registry = server.registry();
    let args = json!({ "filePath": project.arg("src/index.ts") });

    let first = dependency_tree(registry, args.clone()).await;
    assert_eq!(registry.context().dependency_cache.len(), 1);

    // Only the start file is fingerprinted, so a new dependency stays
    // invisible until the start file itself changes.
    project.write("src/d.ts", "export {};\n").unwrap();
    project.write("src/b.ts", "import './d';\n").unwrap();
    let cached = dependency_tree(registry, args.clone()).await;
    assert_eq!(cached, first);

    std::thread::sleep(Duration::from_millis(20));
    project
        .write("src/index.ts", "import './b';\n")
        .unwrap();
    let rebuilt = dependency_tree(registry, args).await;
    let files: Vec<&str> = rebuilt.iter().map(|n| n.file_path.as_str()).collect();
    assert_eq!(
        files,
        vec![
            project.arg("src/index.ts").as_str(),
            project.arg("src/b.ts").as_str(),
            project.arg("src/d.ts").as_str(),
        ]
    );
}

#[tokio::test]
async fn test_tsconfig_paths_and_separate_cache_namespace() {
    let project = TestProject::new().unwrap();
    project
        .write(
            "tsconfig.json",
            r#"{
                // comments and trailing commas are tolerated
                "compilerOptions": {
                    "baseUrl": ".",
                    "paths": { "@lib/*": ["lib/*"], },
                },
            }"#,
        )
        .unwrap();
    project.write("src/main.ts", "import { util } from '@lib/util';\n").unwrap();
    project.write("lib/util.ts", "export const util = 1;\n").unwrap();
    let server = project.server().unwrap();
    let registry = server.registry();

    let plain = dependency_tree(registry, json!({ "filePath": project.arg("src/main.ts") })).await;
    assert_eq!(plain.len(), 1);

    let mapped = dependency_tree(
        registry,
        json!({ "filePath": project.arg("src/main.ts"), "tsConfig": project.arg("tsconfig.json") }),
    )
    .await;
    assert_eq!(mapped.len(), 2);
    assert_eq!(mapped[1].file_path, project.arg("lib/util.ts"));
    assert_eq!(registry.context().dependency_cache.len(), 2);
}

#[tokio::test]
async fn test_missing_start_file_is_tool_error() {
    let project = TestProject::new().unwrap();
    let server = project.server().unwrap();

    let result = server
        .registry()
        .call("get-dependency-tree", json!({ "filePath": project.arg("nope.ts") }))
        .await
        .unwrap();

    assert!(result.is_error);
    assert!(result.content[0].text.starts_with("Error running get-dependency-tree:"));
    assert!(server.registry().context().dependency_cache.is_empty());
}

#[tokio::test]
async fn test_expired_entries_are_rebuilt() {
    let project = diamond();
    let context = project
        .context_with(CacheOptions {
            max_age: Duration::from_millis(1),
            check_file_changes: false,
        })
        .unwrap();
    let registry = ToolRegistry::new(context);
    let args = json!({ "filePath": project.arg("src/index.ts") });

    dependency_tree(&registry, args.clone()).await;
    project.write("src/index.ts", "export {};\n").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let nodes = dependency_tree(&registry, args).await;
    assert_eq!(nodes.len(), 1);
}
