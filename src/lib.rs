// Copyright 2018-2024 the Deno authors. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

mod ast;
mod emit;
mod graph;
mod module_specifier;
mod packer;
mod plugin;
mod rename;
mod reorder;
mod runtime;
pub mod source;
mod swc_helpers;

use serde::Deserialize;
use serde::Serialize;

use source::FileSystemLoader;
use source::Loader;

pub use ast::DefaultModuleParser;
pub use ast::ModuleParser;
pub use ast::ModuleSource;
pub use ast::ParseError;
pub use ast::ParseOptions;
pub use ast::ParsedModule;
pub use deno_ast::swc::ast::Module;
pub use deno_ast::swc::ast::ModuleItem;
pub use deno_ast::MediaType;
pub use emit::emit_module;
pub use emit::EmitError;
pub use graph::Dependency;
pub use graph::DependencyGraph;
pub use graph::DependencyId;
pub use graph::ExportBinding;
pub use graph::PackError;
pub use graph::ResolvedExport;
pub use module_specifier::resolve_import;
pub use module_specifier::runtime_key;
pub use module_specifier::ModuleSpecifier;
pub use module_specifier::SpecifierError;
pub use plugin::transform_plugin;
pub use reorder::reorder_statements;

/// Options controlling the packed output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackConfig {
  /// Strip every export from the output.
  pub no_exports: bool,
  /// Export the public names of the entry modules from the output.
  pub export_primary: bool,
  /// Follow `import("...")` calls and route them through the runtime loader.
  pub parse_dynamic: bool,
  /// Only add modules that are imported dynamically, or whose namespace is
  /// referenced, to the runtime loader.
  pub bare: bool,
  /// Move declarations ahead of other statements.
  pub reorder: bool,
}

#[derive(Default)]
pub struct PackOptions<'a> {
  /// Loads the modules. Defaults to reading files relative to the current
  /// working directory.
  pub maybe_loader: Option<&'a dyn Loader>,
  pub maybe_parser: Option<&'a dyn ModuleParser>,
  pub config: PackConfig,
}

#[derive(Default)]
pub struct PluginOptions<'a> {
  pub maybe_loader: Option<&'a dyn Loader>,
  pub maybe_parser: Option<&'a dyn ModuleParser>,
}

fn with_module_source<T>(
  maybe_loader: Option<&dyn Loader>,
  maybe_parser: Option<&dyn ModuleParser>,
  f: impl FnOnce(&ModuleSource) -> Result<T, PackError>,
) -> Result<T, PackError> {
  let file_system_loader;
  let loader: &dyn Loader = match maybe_loader {
    Some(loader) => loader,
    None => {
      let cwd = std::env::current_dir().map_err(PackError::CurrentDir)?;
      file_system_loader = FileSystemLoader::new(cwd);
      &file_system_loader
    }
  };
  let default_parser = DefaultModuleParser::new();
  let parser = maybe_parser.unwrap_or(&default_parser);
  f(&ModuleSource::new(loader, parser))
}

/// Packs the modules reachable from the entry files into a single module.
///
/// Entry files are absolute paths from the root of the packed tree (for
/// example `/main.js`) or fully qualified URLs.
pub fn pack<S: AsRef<str>>(
  roots: &[S],
  options: PackOptions,
) -> Result<Module, PackError> {
  with_module_source(options.maybe_loader, options.maybe_parser, |source| {
    packer::pack_graph(roots, source, &options.config)
  })
}

/// Transforms a single module so it loads its imports through the runtime
/// loader of a packed bundle.
pub fn plugin<S: AsRef<str>>(
  files: &[S],
  options: PluginOptions,
) -> Result<Module, PackError> {
  let [file] = files else {
    return Err(PackError::PluginFileCount(files.len()));
  };
  let specifier = module_specifier::resolve_entry(file.as_ref())
    .ok_or_else(|| PackError::InvalidUrl(file.as_ref().to_string()))?;
  with_module_source(options.maybe_loader, options.maybe_parser, |source| {
    let parsed = source.load(&specifier)?;
    transform_plugin(&parsed, &specifier)
  })
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use source::MemoryLoader;

  use super::*;

  fn pack_text(
    sources: Vec<(&str, &str)>,
    roots: &[&str],
    config: PackConfig,
  ) -> Result<String, PackError> {
    let loader = MemoryLoader::new(sources);
    let module = pack(
      roots,
      PackOptions {
        maybe_loader: Some(&loader),
        config,
        ..Default::default()
      },
    )?;
    Ok(emit_module(&module).unwrap())
  }

  #[test]
  fn test_pack_config() {
    let config: PackConfig = serde_json::from_value(serde_json::json!({
      "noExports": true,
      "parseDynamic": true,
    }))
    .unwrap();
    assert_eq!(
      config,
      PackConfig {
        no_exports: true,
        parse_dynamic: true,
        ..Default::default()
      }
    );
    assert_eq!(
      serde_json::to_value(PackConfig::default()).unwrap(),
      serde_json::json!({
        "noExports": false,
        "exportPrimary": false,
        "parseDynamic": false,
        "bare": false,
        "reorder": false,
      })
    );
  }

  #[test]
  fn test_pack_strips_exports() {
    let output = pack_text(
      vec![
        (
          "/main.js",
          "import fn from './lib/utils.js';\nconst v = 2;\nconsole.log(v + fn());\n",
        ),
        ("/lib/utils.js", "export default () => 1;"),
      ],
      &["/main.js"],
      PackConfig {
        no_exports: true,
        ..Default::default()
      },
    )
    .unwrap();
    let b_default = output.find("const b_default = ").unwrap();
    let a_v = output.find("const a_v = 2;").unwrap();
    let log = output.find("console.log(a_v + b_default());").unwrap();
    assert!(b_default < a_v && a_v < log, "{}", output);
    assert!(!output.contains("export"), "{}", output);
    assert!(!output.contains("imports"), "{}", output);
  }

  #[test]
  fn test_pack_errors() {
    let err = pack_text(vec![], &[], PackConfig::default()).unwrap_err();
    assert!(matches!(err, PackError::NoFiles));
    assert_eq!(err.to_string(), "no files");

    let err =
      pack_text(vec![("/main.js", "")], &["./main.js"], PackConfig::default())
        .unwrap_err();
    assert!(matches!(err, PackError::InvalidUrl(_)));
  }

  #[test]
  fn test_plugin_file_count() {
    let loader = MemoryLoader::default();
    let err = plugin(
      &["/a.js", "/b.js"],
      PluginOptions {
        maybe_loader: Some(&loader),
        ..Default::default()
      },
    )
    .unwrap_err();
    assert!(matches!(err, PackError::PluginFileCount(2)));
    let err = plugin(
      &["/a.js"],
      PluginOptions {
        maybe_loader: Some(&loader),
        ..Default::default()
      },
    )
    .unwrap_err();
    assert!(matches!(err, PackError::ModuleNotFound(_)));
  }
}
