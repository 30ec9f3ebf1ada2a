// Copyright 2018-2024 the Deno authors. MIT license.

use once_cell::sync::Lazy;

pub type ModuleSpecifier = url::Url;

pub use import_map::specifier::resolve_import;
pub use import_map::specifier::SpecifierError;

/// The base that entry files given as absolute paths are resolved against.
pub static ROOT_SPECIFIER: Lazy<ModuleSpecifier> =
  Lazy::new(|| ModuleSpecifier::parse("file:///").unwrap());

/// Resolves an entry file. Entries must be absolute paths from the root of
/// the packed tree (ie. `/main.js`) or fully qualified URLs.
pub fn resolve_entry(entry: &str) -> Option<ModuleSpecifier> {
  if entry.starts_with("//") {
    return None;
  }
  if entry.starts_with('/') {
    return ROOT_SPECIFIER.join(entry).ok();
  }
  let specifier = ModuleSpecifier::parse(entry).ok()?;
  if specifier.cannot_be_a_base() {
    return None;
  }
  Some(specifier)
}

/// The key a module is known by at runtime, used by the loader table and
/// `include` calls.
pub fn runtime_key(specifier: &ModuleSpecifier) -> String {
  if specifier.scheme() == "file" {
    specifier.path().to_string()
  } else {
    specifier.to_string()
  }
}
