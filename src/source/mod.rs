// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashMap;
use std::sync::Arc;

use deno_ast::MediaType;
use deno_error::JsErrorClass;
use thiserror::Error;

use crate::module_specifier::resolve_entry;
use crate::ModuleSpecifier;

mod file_system;

pub use file_system::FileSystemLoader;

/// The source of a module returned by a loader.
#[derive(Debug, Clone)]
pub struct LoadResponse {
  /// The text of the module.
  pub content: Arc<str>,
  /// How the text should be parsed.
  pub media_type: MediaType,
}

#[derive(Debug, Clone, Error, deno_error::JsError)]
pub enum LoadError {
  #[class(inherit)]
  #[error(transparent)]
  Other(Arc<dyn JsErrorClass>),
}

pub type LoadResult = Result<Option<LoadResponse>, LoadError>;

/// A trait which allows the packer to load modules.
pub trait Loader {
  /// A method that given a specifier returns the source of the module.
  ///
  /// `Ok(None)` means the module does not exist.
  fn load(&self, specifier: &ModuleSpecifier) -> LoadResult;
}

fn parse_specifier(specifier: &str) -> ModuleSpecifier {
  resolve_entry(specifier).unwrap()
}

/// An implementation of the loader where the sources are provided ahead of
/// time. This is useful for testing or for packing sources that never touch
/// a file system.
///
/// Specifiers may be given as absolute paths (`/main.js`) or full URLs.
#[derive(Default)]
pub struct MemoryLoader {
  sources:
    HashMap<ModuleSpecifier, Result<LoadResponse, Arc<dyn JsErrorClass>>>,
}

impl MemoryLoader {
  pub fn new<S: AsRef<str>>(sources: Vec<(S, S)>) -> Self {
    let mut loader = Self::default();
    for (specifier, text) in sources {
      loader.add_source_with_text(specifier, text);
    }
    loader
  }

  pub fn add_source_with_text(
    &mut self,
    specifier: impl AsRef<str>,
    source: impl AsRef<str>,
  ) {
    let specifier = parse_specifier(specifier.as_ref());
    let media_type = MediaType::from_specifier(&specifier);
    self.sources.insert(
      specifier,
      Ok(LoadResponse {
        content: source.as_ref().into(),
        media_type,
      }),
    );
  }

  /// Makes loading the specifier fail with the provided error.
  pub fn add_error(
    &mut self,
    specifier: impl AsRef<str>,
    error: Arc<dyn JsErrorClass>,
  ) {
    let specifier = parse_specifier(specifier.as_ref());
    self.sources.insert(specifier, Err(error));
  }
}

impl Loader for MemoryLoader {
  fn load(&self, specifier: &ModuleSpecifier) -> LoadResult {
    match self.sources.get(specifier) {
      Some(Ok(response)) => Ok(Some(response.clone())),
      Some(Err(err)) => Err(LoadError::Other(err.clone())),
      None => Ok(None),
    }
  }
}
