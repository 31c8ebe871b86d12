//! The filesystem tools through the registry.

use codebase_mcp::test_utils::TestProject;
use codebase_mcp::tools::ToolRegistry;
use serde_json::{Value, json};

async fn call_ok(registry: &ToolRegistry, tool: &str, args: Value) -> String {
    let result = registry.call(tool, args).await.unwrap();
    assert!(!result.is_error, "{tool} failed: {}", result.content[0].text);
    result.content[0].text.clone()
}

fn web_app() -> TestProject {
    let project = TestProject::new().unwrap();
    project
        .write(
            "package.json",
            r#"{
  "name": "web-app",
  "version": "0.4.0",
  "main": "dist/index.js",
  "dependencies": { "react": "^18.0.0", "axios": "^1.0.0" },
  "devDependencies": { "vite": "^5.0.0" }
}"#,
        )
        .unwrap();
    project.write("tsconfig.json", "{}").unwrap();
    project.write("src/app/main.tsx", "import './styles.css';").unwrap();
    project.write("src/app/styles.css", "body {}").unwrap();
    project.write("packages/ui/vite.config.ts", "export default {};").unwrap();
    project.write("node_modules/react/tsconfig.json", "{}").unwrap();
    project.write("node_modules/react/vite.config.ts", "").unwrap();
    project.mkdir(".vscode").unwrap();
    project
}

#[tokio::test]
async fn test_project_basics() {
    let project = web_app();
    let server = project.server().unwrap();

    let out = call_ok(server.registry(), "get-project-basics", json!({})).await;
    let basics: Value = serde_json::from_str(&out).unwrap();

    assert_eq!(basics["name"], "web-app");
    assert_eq!(basics["main"], "dist/index.js");
    assert!(basics.get("description").is_none());
    assert_eq!(basics["dependencies"], json!(["react", "axios"]));
    assert_eq!(basics["devDependencies"], json!(["vite"]));
    assert_eq!(
        basics["directories"]["1"],
        json!([".vscode", "node_modules", "packages", "src"])
    );
    assert_eq!(
        basics["directories"]["2"],
        json!(["node_modules/react", "packages/ui", "src/app"])
    );
}

#[tokio::test]
async fn test_search_config_files_with_exclusions() {
    let project = web_app();
    let server = project.server().unwrap();

    let out = call_ok(
        server.registry(),
        "search-config-files",
        json!({
            "targetConfigFilePatterns": "tsconfig.json, vite.config.*, .eslintrc",
            "excludePatterns": "node_modules"
        }),
    )
    .await;
    let matches: Value = serde_json::from_str(&out).unwrap();

    assert_eq!(
        matches,
        json!([
            { "pattern": "tsconfig.json", "filePath": project.arg("tsconfig.json") },
            { "pattern": "vite.config.*", "filePath": project.arg("packages/ui/vite.config.ts") },
            { "pattern": ".eslintrc", "filePath": "Not found" },
        ])
    );
}

#[tokio::test]
async fn test_list_directory() {
    let project = web_app();
    let server = project.server().unwrap();

    let out = call_ok(
        server.registry(),
        "list-directory",
        json!({ "directoryPath": project.arg("src/app") }),
    )
    .await;
    assert_eq!(out, "[FILE] main.tsx\n[FILE] styles.css");

    let out = call_ok(
        server.registry(),
        "list-directory",
        json!({ "directoryPath": project.root().display().to_string() }),
    )
    .await;
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "[DIR] .vscode",
            "[DIR] node_modules",
            "[FILE] package.json",
            "[DIR] packages",
            "[DIR] src",
            "[FILE] tsconfig.json",
        ]
    );
}

#[tokio::test]
async fn test_read_file_with_metadata() {
    let project = web_app();
    let server = project.server().unwrap();

    let out = call_ok(
        server.registry(),
        "read-file-with-metadata",
        json!({ "filePath": project.arg("src/app/styles.css") }),
    )
    .await;
    let file: Value = serde_json::from_str(&out).unwrap();

    assert_eq!(file["content"], "body {}");
    assert_eq!(file["metadata"]["size"], 7);
    assert_eq!(file["metadata"]["isFile"], true);
    assert_eq!(file["metadata"]["isDirectory"], false);
    assert!(file["metadata"]["modified"].as_str().unwrap().ends_with('Z'));
    assert_eq!(file["metadata"]["permissions"].as_str().unwrap().len(), 3);
}

#[tokio::test]
async fn test_invalid_arguments_are_tool_errors() {
    let project = web_app();
    let server = project.server().unwrap();

    let result = server
        .registry()
        .call("list-directory", json!({ "directoryPath": 42 }))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result.content[0].text.starts_with("Error running list-directory:"));

    assert!(server.registry().call("delete-everything", json!({})).await.is_err());
}
