//! Sandbox behaviour seen through the tools.

use codebase_mcp::core::CodebaseError;
use codebase_mcp::test_utils::TestProject;
use serde_json::json;

#[test]
fn test_traversal_out_of_root_is_denied() {
    let project = TestProject::new().unwrap();
    project.mkdir("src").unwrap();
    let sandbox = project.sandbox().unwrap();

    let escape = format!("{}/src/../../etc/passwd", project.root().display());
    let err = sandbox.resolve(&escape).unwrap_err();
    assert!(matches!(err, CodebaseError::AccessDenied { .. }));
}

#[test]
fn test_sibling_with_shared_prefix_is_denied() {
    let project = TestProject::new().unwrap();
    let sibling = format!("{}-other/file.txt", project.root().display());

    let err = project.sandbox().unwrap().resolve(&sibling).unwrap_err();
    assert!(err.is_sandbox_violation());
}

#[test]
fn test_new_file_with_existing_parent_is_allowed() {
    let project = TestProject::new().unwrap();
    project.mkdir("out").unwrap();
    let sandbox = project.sandbox().unwrap();

    let resolved = sandbox.resolve(&project.arg("out/new.txt")).unwrap();
    assert_eq!(resolved, project.path("out/new.txt"));

    let err = sandbox.resolve(&project.arg("missing/new.txt")).unwrap_err();
    assert!(matches!(err, CodebaseError::ParentMissing { .. }));
}

#[cfg(unix)]
#[test]
fn test_symlink_pointing_outside_is_denied() {
    let project = TestProject::new().unwrap();
    let outside = TestProject::new().unwrap();
    outside.write("secret.txt", "top secret").unwrap();
    std::os::unix::fs::symlink(outside.path("secret.txt"), project.path("link.txt")).unwrap();
    std::os::unix::fs::symlink(outside.path("gone.txt"), project.path("dangling.txt")).unwrap();
    let sandbox = project.sandbox().unwrap();

    assert!(sandbox.resolve(&project.arg("link.txt")).unwrap_err().is_sandbox_violation());
    assert!(sandbox.resolve(&project.arg("dangling.txt")).unwrap_err().is_sandbox_violation());
}

#[cfg(unix)]
#[test]
fn test_symlink_inside_root_resolves_to_target() {
    let project = TestProject::new().unwrap();
    project.write("real/config.json", "{}").unwrap();
    std::os::unix::fs::symlink(project.path("real"), project.path("alias")).unwrap();

    let resolved = project.sandbox().unwrap().resolve(&project.arg("alias/config.json")).unwrap();
    assert_eq!(resolved, project.path("real/config.json"));
}

#[tokio::test]
async fn test_every_path_tool_rejects_outside_paths() {
    let project = TestProject::new().unwrap();
    let outside = TestProject::new().unwrap();
    outside.write("a.ts", "export {};").unwrap();
    let server = project.server().unwrap();
    let registry = server.registry();
    let target = outside.arg("a.ts");

    for (tool, args) in [
        ("list-directory", json!({ "directoryPath": outside.root().display().to_string() })),
        ("read-file-with-metadata", json!({ "filePath": target })),
        ("get-dependency-tree", json!({ "filePath": target })),
    ] {
        let result = registry.call(tool, args).await.unwrap();
        assert!(result.is_error, "{tool} should refuse paths outside the root");
        assert!(
            result.content[0].text.starts_with(&format!("Error running {tool}: Access denied")),
            "unexpected message from {tool}: {}",
            result.content[0].text
        );
    }
}
