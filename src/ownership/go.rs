//! Go import-graph ownership (go.mod + tree-sitter-go).
//!
//! A build target is the package containing its main input plus every
//! package of the same module reachable through imports. A file belongs to
//! the target when it lives in one of those package directories.
//!
//! Resolved package sets are cached per main input. An entry is dropped when
//! a source file inside one of its packages changes, or when the module path
//! in `go.mod` no longer matches.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tree_sitter::{Node, Parser};

use super::OwnershipOracle;
use crate::watcher::{EventKind, WatchError};

pub struct GoImportOracle {
    root: PathBuf,
    parser: Mutex<Parser>,
    resolved: Mutex<HashMap<PathBuf, ResolvedTarget>>,
}

struct ResolvedTarget {
    module: String,
    packages: HashSet<PathBuf>,
}

impl std::fmt::Debug for GoImportOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoImportOracle")
            .field("root", &self.root)
            .field("cached_targets", &self.resolved.lock().len())
            .finish()
    }
}

impl GoImportOracle {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| WatchError::InitFailed {
                reason: format!("Failed to set Go language: {e}"),
            })?;

        Ok(Self {
            root: root.into(),
            parser: Mutex::new(parser),
            resolved: Mutex::new(HashMap::new()),
        })
    }

    /// Module path declared by `<root>/go.mod`.
    pub fn module_path(&self) -> Result<String, WatchError> {
        let go_mod = self.root.join("go.mod");
        let content = fs::read_to_string(&go_mod).map_err(|e| WatchError::OwnershipUnresolved {
            path: go_mod.clone(),
            reason: e.to_string(),
        })?;

        parse_module_directive(&content).ok_or_else(|| WatchError::OwnershipUnresolved {
            path: go_mod,
            reason: "no module directive".to_string(),
        })
    }

    /// Package directories compiled into the target rooted at `main_input`,
    /// read fresh from disk.
    pub fn target_packages(&self, main_input: &Path) -> Result<HashSet<PathBuf>, WatchError> {
        let module = self.module_path()?;
        self.resolve(main_input, &module)
    }

    fn resolve(&self, main_input: &Path, module: &str) -> Result<HashSet<PathBuf>, WatchError> {
        let main_file = self.root.join(main_input);
        if !main_file.is_file() {
            return Err(WatchError::OwnershipUnresolved {
                path: main_file,
                reason: "main input file not found".to_string(),
            });
        }
        let main_dir = main_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        let mut packages = HashSet::new();
        let mut queue = VecDeque::new();
        packages.insert(normalize(&main_dir));
        queue.push_back(main_dir);

        while let Some(dir) = queue.pop_front() {
            for import in self.imports_in_dir(&dir) {
                let Some(relative) = module_relative(module, &import) else {
                    continue;
                };
                let package_dir = self.root.join(relative);
                if package_dir.is_dir() && packages.insert(normalize(&package_dir)) {
                    queue.push_back(package_dir);
                }
            }
        }

        crate::debug_event!(
            "ownership",
            "resolved",
            "{} -> {} packages",
            main_input.display(),
            packages.len()
        );
        Ok(packages)
    }

    /// Imports of every non-test `.go` file directly inside `dir`.
    fn imports_in_dir(&self, dir: &Path) -> Vec<String> {
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut imports = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !is_build_source(&path) {
                continue;
            }
            if let Ok(code) = fs::read_to_string(&path) {
                imports.extend(self.extract_imports(&code));
            }
        }
        imports
    }

    /// Import paths declared in Go source.
    pub fn extract_imports(&self, code: &str) -> Vec<String> {
        let tree = match self.parser.lock().parse(code, None) {
            Some(tree) => tree,
            None => return Vec::new(),
        };

        let mut imports = Vec::new();
        collect_import_specs(tree.root_node(), code, &mut imports);
        imports
    }
}

impl OwnershipOracle for GoImportOracle {
    fn is_owned(&self, main_input: &Path, file: &Path, kind: EventKind) -> Result<bool, WatchError> {
        if !is_build_source(file) {
            return Ok(false);
        }

        let module = self.module_path()?;
        let file = if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root.join(file)
        };
        let Some(dir) = file.parent().map(normalize) else {
            return Ok(false);
        };

        let mut resolved = self.resolved.lock();
        let cached = resolved
            .get(main_input)
            .is_some_and(|target| target.module == module);
        if !cached {
            let packages = self.resolve(main_input, &module)?;
            resolved.insert(main_input.to_path_buf(), ResolvedTarget { module, packages });
        }

        let owned = resolved
            .get(main_input)
            .is_some_and(|target| target.packages.contains(&dir));

        // The change may add or drop imports of this target.
        if owned && cached {
            resolved.remove(main_input);
            crate::debug_event!("ownership", "invalidated", "{}", main_input.display());
        }

        crate::debug_event!(
            "ownership",
            "query",
            "{} {kind} owned by {}: {owned}",
            file.display(),
            main_input.display()
        );
        Ok(owned)
    }
}

fn collect_import_specs(node: Node, code: &str, imports: &mut Vec<String>) {
    if node.kind() == "import_spec" {
        if let Some(path_node) = node.child_by_field_name("path") {
            if let Ok(text) = path_node.utf8_text(code.as_bytes()) {
                imports.push(text.trim_matches(|c| c == '"' || c == '`').to_string());
            }
        }
        return;
    }

    // Imports only appear at the top level; skip function bodies.
    if matches!(node.kind(), "function_declaration" | "method_declaration") {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_import_specs(child, code, imports);
    }
}

fn parse_module_directive(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or("").trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}

/// `example/pkg/greet` under module `example` -> `pkg/greet`.
fn module_relative<'a>(module: &str, import: &'a str) -> Option<&'a str> {
    if import == module {
        return Some("");
    }
    import.strip_prefix(module)?.strip_prefix('/')
}

fn is_build_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.ends_with("_test.go")
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
