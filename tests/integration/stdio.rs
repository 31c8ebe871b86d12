//! The compiled binary speaking JSON-RPC over stdin/stdout.

use assert_cmd::Command;
use codebase_mcp::test_utils::TestProject;
use predicates::prelude::*;
use serde_json::{Value, json};

fn session(project: &TestProject, messages: &[Value]) -> Vec<Value> {
    let input: String = messages.iter().map(|m| format!("{m}\n")).collect();

    let output = Command::cargo_bin("codebase-mcp")
        .unwrap()
        .arg(project.root())
        .env_remove("CODEBASE_MCP_CONFIG")
        .env("RUST_LOG", "debug")
        .write_stdin(input)
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout must only carry JSON-RPC"))
        .collect()
}

#[test]
fn test_full_session() {
    let project = TestProject::new().unwrap();
    project.write("package.json", r#"{ "name": "demo" }"#).unwrap();
    project.write("src/index.ts", "import './util';").unwrap();
    project.write("src/util.ts", "export {};").unwrap();

    let responses = session(
        &project,
        &[
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize",
                    "params": { "protocolVersion": "2024-11-05", "capabilities": {},
                                "clientInfo": { "name": "test", "version": "0" } } }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                    "params": { "name": "get-dependency-tree",
                                "arguments": { "filePath": project.arg("src/index.ts") } } }),
            json!({ "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                    "params": { "name": "read-file-with-metadata",
                                "arguments": { "filePath": "/etc/hostname" } } }),
            json!({ "jsonrpc": "2.0", "id": 5, "method": "tools/call",
                    "params": { "name": "no-such-tool", "arguments": {} } }),
        ],
    );

    assert_eq!(responses.len(), 5);
    let ids: Vec<&Value> = responses.iter().map(|r| &r["id"]).collect();
    assert_eq!(ids, vec![&json!(1), &json!(2), &json!(3), &json!(4), &json!(5)]);

    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "codebase-mcp");

    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "get-project-basics",
            "search-config-files",
            "get-dependency-tree",
            "list-directory",
            "read-file-with-metadata",
        ]
    );

    let graph: Value =
        serde_json::from_str(responses[2]["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(graph.as_array().unwrap().len(), 2);
    assert_eq!(graph[1]["filePath"], project.arg("src/util.ts"));
    assert_eq!(graph[1]["parents"], json!([1]));

    assert_eq!(responses[3]["result"]["isError"], true);
    assert_eq!(responses[4]["error"]["code"], -32602);
}

#[test]
fn test_malformed_line_does_not_stop_the_server() {
    let project = TestProject::new().unwrap();

    let output = Command::cargo_bin("codebase-mcp")
        .unwrap()
        .arg(project.root())
        .env_remove("CODEBASE_MCP_CONFIG")
        .write_stdin("this is not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<Value> = stdout.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines[0]["error"]["code"], -32700);
    assert_eq!(lines[1], json!({ "jsonrpc": "2.0", "id": 7, "result": {} }));
}

#[test]
fn test_invalid_root_exits_with_error() {
    let project = TestProject::new().unwrap();

    Command::cargo_bin("codebase-mcp")
        .unwrap()
        .arg(project.path("does-not-exist"))
        .env_remove("CODEBASE_MCP_CONFIG")
        .write_stdin("")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Invalid root directory"));
}

#[test]
fn test_config_file_from_environment() {
    let project = TestProject::new().unwrap();
    let config = project.write("server.toml", "[cache]\nunknown_key = 1\n").unwrap();

    Command::cargo_bin("codebase-mcp")
        .unwrap()
        .arg(project.root())
        .env("CODEBASE_MCP_CONFIG", &config)
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));

    project
        .write("server.toml", "[cache]\nmax_age_ms = 5000\ncheck_file_changes = false\n")
        .unwrap();
    Command::cargo_bin("codebase-mcp")
        .unwrap()
        .arg(project.root())
        .env("CODEBASE_MCP_CONFIG", &config)
        .write_stdin("")
        .assert()
        .success();
}

#[test]
fn test_missing_root_argument_is_usage_error() {
    Command::cargo_bin("codebase-mcp")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("ROOT"));
}
