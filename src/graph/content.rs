//! Where dependency-node content comes from.

use std::io;
use std::path::Path;

use futures::FutureExt;
use futures::future::BoxFuture;

/// Asynchronous file reader used by [`DependencyGraphBuilder`](super::DependencyGraphBuilder).
///
/// The returned future must not borrow `self` or `path` so it can be shared
/// between every node waiting on the same file.
pub trait ContentSource: Send + Sync {
    /// Read the whole file at `path` as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> BoxFuture<'static, io::Result<String>>;
}

/// Reads from the local filesystem through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentSource;

impl ContentSource for FsContentSource {
    fn read_to_string(&self, path: &Path) -> BoxFuture<'static, io::Result<String>> {
        let path = path.to_path_buf();
        async move { tokio::fs::read_to_string(path).await }.boxed()
    }
}
