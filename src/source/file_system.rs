// Copyright 2018-2024 the Deno authors. MIT license.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use deno_ast::MediaType;

use super::LoadError;
use super::LoadResponse;
use super::LoadResult;
use super::Loader;
use crate::ModuleSpecifier;

/// Loads `file:` specifiers from a directory on disk, treating the directory
/// as the root of the packed tree.
///
/// Sources are probed in this order:
///
/// 1. for a `.js` path, its `.ts` sibling
/// 2. the exact path
/// 3. the path with `.ts` appended
/// 4. the path with `.js` appended
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
  base: PathBuf,
}

impl FileSystemLoader {
  pub fn new(base: impl Into<PathBuf>) -> Self {
    Self { base: base.into() }
  }

  fn candidates(relative: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(4);
    if let Some(stem) = relative.strip_suffix(".js") {
      candidates.push(format!("{}.ts", stem));
    }
    candidates.push(relative.to_string());
    if !relative.ends_with(".ts") {
      candidates.push(format!("{}.ts", relative));
    }
    if !relative.ends_with(".js") {
      candidates.push(format!("{}.js", relative));
    }
    candidates
  }

  fn load_path(&self, path: &Path) -> LoadResult {
    match std::fs::read_to_string(path) {
      Ok(text) => {
        log::debug!("Read {}", path.display());
        Ok(Some(LoadResponse {
          content: text.into(),
          media_type: MediaType::from_path(path),
        }))
      }
      Err(err) => Err(LoadError::Other(Arc::new(err))),
    }
  }
}

impl Loader for FileSystemLoader {
  fn load(&self, specifier: &ModuleSpecifier) -> LoadResult {
    if specifier.scheme() != "file" {
      return Ok(None);
    }
    let relative = match specifier.to_file_path() {
      Ok(path) => path.to_string_lossy().to_string(),
      Err(()) => specifier.path().to_string(),
    };
    let relative = relative.trim_start_matches(['/', '\\']);
    for candidate in Self::candidates(relative) {
      let path = self.base.join(candidate);
      if path.is_file() {
        return self.load_path(&path);
      }
    }
    Ok(None)
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn probes_candidates_in_order() {
    assert_eq!(
      FileSystemLoader::candidates("lib/mod.js"),
      vec!["lib/mod.ts", "lib/mod.js", "lib/mod.js.ts"]
    );
    assert_eq!(
      FileSystemLoader::candidates("lib/mod.ts"),
      vec!["lib/mod.ts", "lib/mod.ts.js"]
    );
    assert_eq!(
      FileSystemLoader::candidates("lib/mod"),
      vec!["lib/mod", "lib/mod.ts", "lib/mod.js"]
    );
  }

  #[test]
  fn loads_from_base_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let lib_dir = temp_dir.path().join("lib");
    std::fs::create_dir(&lib_dir).unwrap();
    std::fs::write(lib_dir.join("a.js"), "export const a = 1;").unwrap();
    std::fs::write(lib_dir.join("b.js"), "export const b = 1;").unwrap();
    std::fs::write(lib_dir.join("b.ts"), "export const b: number = 2;")
      .unwrap();
    std::fs::write(lib_dir.join("c.ts"), "export const c = 3;").unwrap();

    let loader = FileSystemLoader::new(temp_dir.path());
    let load = |specifier: &str| {
      loader
        .load(&ModuleSpecifier::parse(specifier).unwrap())
        .unwrap()
    };

    let a = load("file:///lib/a.js").unwrap();
    assert_eq!(a.content.as_ref(), "export const a = 1;");
    assert_eq!(a.media_type, MediaType::JavaScript);

    // the typescript sibling wins
    let b = load("file:///lib/b.js").unwrap();
    assert_eq!(b.content.as_ref(), "export const b: number = 2;");
    assert_eq!(b.media_type, MediaType::TypeScript);

    let c = load("file:///lib/c").unwrap();
    assert_eq!(c.media_type, MediaType::TypeScript);

    assert!(load("file:///lib/missing.js").is_none());
    // directories are not modules
    assert!(load("file:///lib").is_none());
    assert!(load("https://example.com/lib/a.js").is_none());
  }
}
