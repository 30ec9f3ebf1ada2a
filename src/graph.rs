// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;

use deno_ast::swc::ast::*;
use deno_ast::swc::utils::find_pat_ids;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitWith;
use indexmap::IndexMap;
use thiserror::Error;

use crate::ast::ModuleSource;
use crate::ast::ParseError;
use crate::ast::ParsedModule;
use crate::module_specifier::resolve_entry;
use crate::module_specifier::resolve_import;
use crate::module_specifier::runtime_key;
use crate::module_specifier::ModuleSpecifier;
use crate::module_specifier::SpecifierError;
use crate::source::LoadError;
use crate::swc_helpers::module_export_name_text;
use crate::swc_helpers::str_value;

#[derive(Debug, Error, deno_error::JsError)]
pub enum PackError {
  #[class(type)]
  #[error("no files")]
  NoFiles,
  #[class(type)]
  #[error("added files must be absolute URLs: {0}")]
  InvalidUrl(String),
  #[class(type)]
  #[error("invalid specifier \"{specifier}\" in {referrer}")]
  InvalidSpecifier {
    specifier: String,
    referrer: ModuleSpecifier,
    #[source]
    source: SpecifierError,
  },
  #[class("NotFound")]
  #[error("module not found: {0}")]
  ModuleNotFound(ModuleSpecifier),
  #[class(generic)]
  #[error("error loading {specifier}: {source}")]
  Load {
    specifier: ModuleSpecifier,
    #[source]
    source: LoadError,
  },
  #[class(syntax)]
  #[error("error parsing {specifier}: {source}")]
  Parse {
    specifier: ModuleSpecifier,
    #[source]
    source: ParseError,
  },
  #[class(syntax)]
  #[error("invalid export \"{name}\" in {specifier}")]
  InvalidExport {
    name: String,
    specifier: ModuleSpecifier,
  },
  #[class(type)]
  #[error("plugin mode requires exactly one file, got {0}")]
  PluginFileCount(usize),
  #[class(inherit)]
  #[error("unable to get the current directory")]
  CurrentDir(#[source] std::io::Error),
}

/// Index of a dependency in the graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyId(usize);

/// How an exported or imported name is satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportBinding {
  /// A top-level binding declared in the dependency.
  Local {
    dependency: DependencyId,
    local: String,
  },
  /// The export `name` of another dependency.
  ReExport {
    dependency: DependencyId,
    name: String,
  },
  /// The namespace object of the dependency.
  Namespace { dependency: DependencyId },
}

/// The concrete origin of an export after following re-exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedExport {
  Binding {
    dependency: DependencyId,
    local: String,
  },
  Namespace {
    dependency: DependencyId,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
  Static,
  Dynamic,
}

/// The prefix for the n-th discovered module: `a` to `z`, then `aa`, `ab`
/// and so on.
pub fn prefix_for_index(mut index: usize) -> String {
  let mut chars = Vec::new();
  loop {
    chars.push((b'a' + (index % 26) as u8) as char);
    if index < 26 {
      break;
    }
    index = index / 26 - 1;
  }
  chars.iter().rev().collect()
}

/// Gets the specifier text of an `import("...")` call with a string literal
/// argument.
pub fn dynamic_import_text(call: &CallExpr) -> Option<String> {
  if !matches!(call.callee, Callee::Import(_)) {
    return None;
  }
  match call.args.first() {
    Some(ExprOrSpread { spread: None, expr }) => match &**expr {
      Expr::Lit(Lit::Str(value)) => Some(str_value(value)),
      _ => None,
    },
    _ => None,
  }
}

#[derive(Default)]
struct DynamicImportCollector {
  specifiers: Vec<String>,
}

impl Visit for DynamicImportCollector {
  fn visit_call_expr(&mut self, call: &CallExpr) {
    if let Some(text) = dynamic_import_text(call) {
      self.specifiers.push(text);
    }
    call.visit_children_with(self);
  }
}

/// Collects the specifiers of all `import("...")` calls in a module, in
/// source order.
pub fn collect_dynamic_imports(module: &Module) -> Vec<String> {
  let mut collector = DynamicImportCollector::default();
  module.visit_with(&mut collector);
  collector.specifiers
}

#[derive(Debug)]
pub struct Dependency {
  pub specifier: ModuleSpecifier,
  pub prefix: String,
  /// Import text as written in the module to the imported dependency.
  pub requires: HashMap<String, DependencyId>,
  pub exports: BTreeMap<String, ExportBinding>,
  /// Local names of import bindings.
  pub imports: HashMap<String, ExportBinding>,
  pub is_entry: bool,
  /// The module is the target of an `import()` call.
  pub dynamic_requirement: bool,
  /// The module's namespace object is referenced.
  pub namespace_requirement: bool,
  module: Option<ParsedModule>,
}

impl Dependency {
  fn new(specifier: ModuleSpecifier, prefix: String) -> Self {
    Self {
      specifier,
      prefix,
      requires: Default::default(),
      exports: Default::default(),
      imports: Default::default(),
      is_entry: false,
      dynamic_requirement: false,
      namespace_requirement: false,
      module: None,
    }
  }

  /// The name a top-level binding of this module has in the packed output.
  pub fn binding_name(&self, local: &str) -> String {
    format!("{}_{}", self.prefix, local)
  }

  pub fn runtime_key(&self) -> String {
    runtime_key(&self.specifier)
  }
}

/// The graph of modules reachable from the entry files.
pub struct DependencyGraph {
  modules: IndexMap<ModuleSpecifier, Dependency>,
  roots: HashMap<String, DependencyId>,
  export_all_from: Vec<(DependencyId, DependencyId)>,
  evaluation_order: Vec<DependencyId>,
  parse_dynamic: bool,
}

impl DependencyGraph {
  pub fn new(parse_dynamic: bool) -> Self {
    Self {
      modules: Default::default(),
      roots: Default::default(),
      export_all_from: Default::default(),
      evaluation_order: Default::default(),
      parse_dynamic,
    }
  }

  pub fn get(&self, id: DependencyId) -> &Dependency {
    &self.modules[id.0]
  }

  pub fn get_mut(&mut self, id: DependencyId) -> &mut Dependency {
    &mut self.modules[id.0]
  }

  #[cfg(test)]
  pub fn get_by_specifier(
    &self,
    specifier: &ModuleSpecifier,
  ) -> Option<(DependencyId, &Dependency)> {
    self
      .modules
      .get_full(specifier)
      .map(|(index, _, dependency)| (DependencyId(index), dependency))
  }

  /// Iterates the dependencies in discovery order.
  pub fn dependencies(
    &self,
  ) -> impl Iterator<Item = (DependencyId, &Dependency)> {
    self
      .modules
      .values()
      .enumerate()
      .map(|(index, dependency)| (DependencyId(index), dependency))
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  /// The dependencies ordered so that every dependency comes after the
  /// modules it imports, except where imports are circular.
  pub fn evaluation_order(&self) -> &[DependencyId] {
    &self.evaluation_order
  }

  pub fn take_module(&mut self, id: DependencyId) -> Option<ParsedModule> {
    self.get_mut(id).module.take()
  }

  pub fn add_entry(
    &mut self,
    source: &ModuleSource,
    entry: &str,
  ) -> Result<DependencyId, PackError> {
    let id = self.add_import(source, None, entry, ImportKind::Static)?;
    self.get_mut(id).is_entry = true;
    Ok(id)
  }

  fn add_import(
    &mut self,
    source: &ModuleSource,
    referrer: Option<DependencyId>,
    text: &str,
    kind: ImportKind,
  ) -> Result<DependencyId, PackError> {
    let cached = match referrer {
      Some(referrer) => self.get(referrer).requires.get(text).copied(),
      None => self.roots.get(text).copied(),
    };
    let id = match cached {
      Some(id) => id,
      None => {
        let specifier = match referrer {
          Some(referrer) => {
            let referrer = &self.get(referrer).specifier;
            resolve_import(text, referrer).map_err(|source| {
              PackError::InvalidSpecifier {
                specifier: text.to_string(),
                referrer: referrer.clone(),
                source,
              }
            })?
          }
          None => resolve_entry(text)
            .ok_or_else(|| PackError::InvalidUrl(text.to_string()))?,
        };
        let id = match self.modules.get_index_of(&specifier) {
          Some(index) => DependencyId(index),
          None => self.add_dependency(source, specifier)?,
        };
        match referrer {
          Some(referrer) => {
            self.get_mut(referrer).requires.insert(text.to_string(), id);
          }
          None => {
            self.roots.insert(text.to_string(), id);
          }
        }
        id
      }
    };
    if kind == ImportKind::Dynamic {
      self.get_mut(id).dynamic_requirement = true;
    }
    Ok(id)
  }

  fn add_dependency(
    &mut self,
    source: &ModuleSource,
    specifier: ModuleSpecifier,
  ) -> Result<DependencyId, PackError> {
    let parsed = source.load(&specifier)?;
    let prefix = prefix_for_index(self.modules.len());
    log::debug!("Adding {} as \"{}\".", specifier, prefix);
    let (index, _) = self
      .modules
      .insert_full(specifier.clone(), Dependency::new(specifier, prefix));
    let id = DependencyId(index);
    self.analyze_imports(source, id, &parsed.module)?;
    self.analyze_exports(id, &parsed.module);
    self.get_mut(id).module = Some(parsed);
    self.evaluation_order.push(id);
    Ok(id)
  }

  fn analyze_imports(
    &mut self,
    source: &ModuleSource,
    id: DependencyId,
    module: &Module,
  ) -> Result<(), PackError> {
    for item in &module.body {
      let ModuleItem::ModuleDecl(decl) = item else {
        continue;
      };
      match decl {
        ModuleDecl::Import(import) if !import.type_only => {
          let target = self.add_import(
            source,
            Some(id),
            &str_value(&import.src),
            ImportKind::Static,
          )?;
          for specifier in &import.specifiers {
            let (local, binding) = match specifier {
              ImportSpecifier::Named(named) => {
                if named.is_type_only {
                  continue;
                }
                let name = match &named.imported {
                  Some(imported) => module_export_name_text(imported),
                  None => named.local.sym.to_string(),
                };
                (
                  named.local.sym.to_string(),
                  ExportBinding::ReExport {
                    dependency: target,
                    name,
                  },
                )
              }
              ImportSpecifier::Default(default) => (
                default.local.sym.to_string(),
                ExportBinding::ReExport {
                  dependency: target,
                  name: "default".to_string(),
                },
              ),
              ImportSpecifier::Namespace(namespace) => (
                namespace.local.sym.to_string(),
                ExportBinding::Namespace { dependency: target },
              ),
            };
            self.get_mut(id).imports.insert(local, binding);
          }
        }
        ModuleDecl::ExportNamed(NamedExport {
          src: Some(src),
          specifiers,
          type_only: false,
          ..
        }) => {
          let target = self.add_import(
            source,
            Some(id),
            &str_value(src),
            ImportKind::Static,
          )?;
          for specifier in specifiers {
            let (exported, binding) = match specifier {
              ExportSpecifier::Named(named) => {
                if named.is_type_only {
                  continue;
                }
                let orig = module_export_name_text(&named.orig);
                let exported = match &named.exported {
                  Some(exported) => module_export_name_text(exported),
                  None => orig.clone(),
                };
                (
                  exported,
                  ExportBinding::ReExport {
                    dependency: target,
                    name: orig,
                  },
                )
              }
              ExportSpecifier::Namespace(namespace) => (
                module_export_name_text(&namespace.name),
                ExportBinding::Namespace { dependency: target },
              ),
              ExportSpecifier::Default(default) => (
                default.exported.sym.to_string(),
                ExportBinding::ReExport {
                  dependency: target,
                  name: "default".to_string(),
                },
              ),
            };
            self.get_mut(id).exports.insert(exported, binding);
          }
        }
        ModuleDecl::ExportAll(export_all) if !export_all.type_only => {
          let target = self.add_import(
            source,
            Some(id),
            &str_value(&export_all.src),
            ImportKind::Static,
          )?;
          self.export_all_from.push((id, target));
        }
        _ => {}
      }
    }
    if self.parse_dynamic {
      for text in collect_dynamic_imports(module) {
        self.add_import(source, Some(id), &text, ImportKind::Dynamic)?;
      }
    }
    Ok(())
  }

  fn analyze_exports(&mut self, id: DependencyId, module: &Module) {
    let local = |local: String| ExportBinding::Local {
      dependency: id,
      local,
    };
    let mut exports = Vec::new();
    for item in &module.body {
      let ModuleItem::ModuleDecl(decl) = item else {
        continue;
      };
      match decl {
        ModuleDecl::ExportDecl(export_decl) => {
          for name in decl_names(&export_decl.decl) {
            exports.push((name.clone(), local(name)));
          }
        }
        ModuleDecl::ExportDefaultDecl(export_default) => {
          let name = match &export_default.decl {
            DefaultDecl::Class(ClassExpr {
              ident: Some(ident), ..
            })
            | DefaultDecl::Fn(FnExpr {
              ident: Some(ident), ..
            }) => ident.sym.to_string(),
            DefaultDecl::TsInterfaceDecl(_) => continue,
            _ => "default".to_string(),
          };
          exports.push(("default".to_string(), local(name)));
        }
        ModuleDecl::ExportDefaultExpr(_) => {
          exports.push(("default".to_string(), local("default".to_string())));
        }
        ModuleDecl::ExportNamed(NamedExport {
          src: None,
          specifiers,
          type_only: false,
          ..
        }) => {
          for specifier in specifiers {
            let ExportSpecifier::Named(named) = specifier else {
              continue;
            };
            if named.is_type_only {
              continue;
            }
            let orig = module_export_name_text(&named.orig);
            let exported = match &named.exported {
              Some(exported) => module_export_name_text(exported),
              None => orig.clone(),
            };
            let binding = match self.get(id).imports.get(&orig) {
              Some(binding) => binding.clone(),
              None => local(orig),
            };
            exports.push((exported, binding));
          }
        }
        _ => {}
      }
    }
    self.get_mut(id).exports.extend(exports);
  }

  /// Copies the exports of `export * from` targets into the exporting
  /// modules until nothing changes. Existing names and `default` are never
  /// overwritten.
  pub fn propagate_export_all(&mut self) {
    let mut passes = 0;
    loop {
      passes += 1;
      let mut changed = false;
      for index in 0..self.export_all_from.len() {
        let (source, target) = self.export_all_from[index];
        let additions = self
          .get(target)
          .exports
          .keys()
          .filter(|name| *name != "default")
          .filter(|name| !self.get(source).exports.contains_key(*name))
          .cloned()
          .collect::<Vec<_>>();
        if additions.is_empty() {
          continue;
        }
        changed = true;
        let exports = &mut self.get_mut(source).exports;
        for name in additions {
          exports.insert(
            name.clone(),
            ExportBinding::ReExport {
              dependency: target,
              name,
            },
          );
        }
      }
      if !changed {
        break;
      }
    }
    log::debug!("Propagated star exports in {} passes.", passes);
  }

  /// Follows the export `name` of the dependency to its concrete origin.
  pub fn resolve_export(
    &self,
    id: DependencyId,
    name: &str,
  ) -> Result<ResolvedExport, PackError> {
    let mut seen = HashSet::new();
    let mut current = (id, name.to_string());
    loop {
      let dependency = self.get(current.0);
      if !seen.insert(current.clone()) {
        log::debug!(
          "Circular export of \"{}\" in {}.",
          current.1,
          dependency.specifier
        );
        return Err(PackError::InvalidExport {
          name: name.to_string(),
          specifier: self.get(id).specifier.clone(),
        });
      }
      match dependency.exports.get(&current.1) {
        Some(ExportBinding::Local { dependency, local }) => {
          return Ok(ResolvedExport::Binding {
            dependency: *dependency,
            local: local.clone(),
          })
        }
        Some(ExportBinding::Namespace { dependency }) => {
          return Ok(ResolvedExport::Namespace {
            dependency: *dependency,
          })
        }
        Some(ExportBinding::ReExport { dependency, name }) => {
          current = (*dependency, name.clone());
        }
        None => {
          return Err(PackError::InvalidExport {
            name: current.1,
            specifier: dependency.specifier.clone(),
          })
        }
      }
    }
  }

  /// Resolves an export or import binding to its concrete origin.
  pub fn resolve_binding(
    &self,
    binding: &ExportBinding,
  ) -> Result<ResolvedExport, PackError> {
    match binding {
      ExportBinding::Local { dependency, local } => {
        Ok(ResolvedExport::Binding {
          dependency: *dependency,
          local: local.clone(),
        })
      }
      ExportBinding::Namespace { dependency } => {
        Ok(ResolvedExport::Namespace {
          dependency: *dependency,
        })
      }
      ExportBinding::ReExport { dependency, name } => {
        self.resolve_export(*dependency, name)
      }
    }
  }
}

/// Names bound by a declaration.
pub fn decl_names(decl: &Decl) -> Vec<String> {
  match decl {
    Decl::Class(class) => vec![class.ident.sym.to_string()],
    Decl::Fn(function) => vec![function.ident.sym.to_string()],
    Decl::Var(var_decl) => var_decl
      .decls
      .iter()
      .flat_map(|decl| find_pat_ids::<_, Id>(&decl.name))
      .map(|id| id.0.to_string())
      .collect(),
    Decl::Using(using_decl) => using_decl
      .decls
      .iter()
      .flat_map(|decl| find_pat_ids::<_, Id>(&decl.name))
      .map(|id| id.0.to_string())
      .collect(),
    _ => Vec::new(),
  }
}
