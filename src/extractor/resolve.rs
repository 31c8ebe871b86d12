//! Module specifier resolution.
//!
//! Maps a specifier seen in a source file to a real file inside the root:
//!
//! - `./x`, `../x` and absolute specifiers are resolved against the importing
//!   file's directory
//! - bare specifiers go through `compilerOptions.paths` and `baseUrl` of the
//!   tsconfig, when one was supplied; otherwise they are packages and skipped
//!
//! Every candidate is probed as-is, with each script extension appended,
//! with a `.js`-family extension rewritten to `.ts`/`.tsx`, and as a
//! directory containing `index.<ext>`. Results are canonicalized and must
//! stay inside the root and outside `node_modules`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::scanner::strip_comments;
use crate::constants::SCRIPT_EXTENSIONS;
use crate::core::CodebaseError;
use crate::utils::fs::{is_within, normalize_path};

/// Path mapping settings from a tsconfig file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TsPathConfig {
    /// Directory bare specifiers are resolved against, if `baseUrl` is set.
    pub base_url: Option<PathBuf>,
    /// Directory `paths` substitutions are relative to.
    pub paths_base: PathBuf,
    /// `paths` patterns and their substitutions.
    pub paths: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTsConfig {
    #[serde(default)]
    compiler_options: RawCompilerOptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCompilerOptions {
    base_url: Option<String>,
    #[serde(default)]
    paths: BTreeMap<String, Vec<String>>,
}

impl TsPathConfig {
    /// Load path mappings from the tsconfig at `path`.
    ///
    /// Comments and trailing commas are tolerated; `extends` is not followed.
    ///
    /// # Errors
    ///
    /// [`CodebaseError::ExtractorFailure`] if the file cannot be read or is
    /// not valid JSON after comment removal.
    pub fn load(path: &Path) -> Result<Self, CodebaseError> {
        let failure = |reason: String| CodebaseError::ExtractorFailure {
            file: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| failure(format!("cannot read tsconfig: {e}")))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("/"));
        Self::parse(&text, dir).map_err(|e| failure(format!("invalid tsconfig: {e}")))
    }

    /// Parse tsconfig text whose file lives in `config_dir`.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the text is not a valid config object.
    pub fn parse(text: &str, config_dir: &Path) -> Result<Self, serde_json::Error> {
        let cleaned = strip_trailing_commas(&strip_comments(text));
        let raw: RawTsConfig = serde_json::from_str(&cleaned)?;
        let options = raw.compiler_options;

        let base_url = options
            .base_url
            .map(|base| normalize_path(&config_dir.join(base)));
        let paths_base = base_url.clone().unwrap_or_else(|| config_dir.to_path_buf());

        Ok(Self {
            base_url,
            paths_base,
            paths: options.paths,
        })
    }

    /// Candidate paths for a bare specifier, most specific mapping first.
    pub fn candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let mut best: Option<(&str, &[String], usize)> = None;

        for (pattern, targets) in &self.paths {
            let matched = match pattern.split_once('*') {
                None => (pattern == specifier).then_some((specifier, usize::MAX)),
                Some((prefix, suffix)) => {
                    let fits = specifier.len() >= prefix.len() + suffix.len()
                        && specifier.starts_with(prefix)
                        && specifier.ends_with(suffix);
                    fits.then(|| {
                        (
                            &specifier[prefix.len()..specifier.len() - suffix.len()],
                            prefix.len(),
                        )
                    })
                }
            };
            if let Some((captured, rank)) = matched {
                if best.is_none_or(|(_, _, best_rank)| rank > best_rank) {
                    best = Some((captured, targets.as_slice(), rank));
                }
            }
        }

        let mut candidates: Vec<PathBuf> = best
            .map(|(captured, targets, _)| {
                targets
                    .iter()
                    .map(|target| {
                        normalize_path(&self.paths_base.join(target.replacen('*', captured, 1)))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(base) = &self.base_url {
            candidates.push(normalize_path(&base.join(specifier)));
        }
        candidates
    }
}

/// Resolves specifiers for one extraction run.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    ts_paths: Option<TsPathConfig>,
}

impl Resolver {
    /// Resolver confined to `root`, optionally consulting tsconfig mappings.
    pub fn new(root: impl Into<PathBuf>, ts_paths: Option<TsPathConfig>) -> Self {
        Self {
            root: root.into(),
            ts_paths,
        }
    }

    /// Resolve `specifier` imported from `importer` to a canonical file path.
    ///
    /// Returns `None` for packages, unresolvable specifiers, and files
    /// outside the root or under `node_modules`.
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf> {
        let specifier = specifier.split(['?', '#']).next().unwrap_or(specifier);

        let candidates = if is_relative(specifier) {
            vec![normalize_path(&importer.parent()?.join(specifier))]
        } else if Path::new(specifier).is_absolute() {
            vec![normalize_path(Path::new(specifier))]
        } else {
            self.ts_paths.as_ref()?.candidates(specifier)
        };

        candidates
            .iter()
            .find_map(|candidate| probe(candidate))
            .and_then(|found| std::fs::canonicalize(found).ok())
            .filter(|real| self.admits(real))
    }

    fn admits(&self, path: &Path) -> bool {
        is_within(path, &self.root) && !path.components().any(|c| c.as_os_str() == "node_modules")
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Whether `path` has one of the script extensions.
pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

fn probe(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }

    for ext in SCRIPT_EXTENSIONS {
        let candidate = with_appended_extension(base, ext);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    // Compiled-output specifiers in TypeScript sources: './x.js' -> './x.ts'
    if let Some(ext) = base.extension().and_then(|ext| ext.to_str()) {
        let rewrites: &[&str] = match ext {
            "js" | "jsx" => &["ts", "tsx"],
            "mjs" => &["mts"],
            "cjs" => &["cts"],
            _ => &[],
        };
        for rewrite in rewrites {
            let candidate = base.with_extension(rewrite);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    if base.is_dir() {
        for ext in SCRIPT_EXTENSIONS {
            let candidate = base.join(format!("index.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    None
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

/// Remove commas that directly precede `}` or `]` outside of strings.
fn strip_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut chars = json.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = json[index + 1..].chars().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
