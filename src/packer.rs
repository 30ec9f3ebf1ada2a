// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashSet;

use deno_ast::swc::ast::Module;
use deno_ast::swc::ast::ModuleItem;
use deno_ast::swc::common::DUMMY_SP;

use crate::ast::ModuleSource;
use crate::graph::DependencyGraph;
use crate::graph::DependencyId;
use crate::graph::PackError;
use crate::graph::ResolvedExport;
use crate::module_specifier::resolve_entry;
use crate::rename::import_meta_name;
use crate::rename::rewrite_dependency;
use crate::reorder::reorder_statements;
use crate::runtime::build_loader_table;
use crate::runtime::loader_items;
use crate::runtime::namespace_lookup;
use crate::runtime::origin_declaration;
use crate::swc_helpers::const_item;
use crate::swc_helpers::export_named_item;
use crate::PackConfig;

/// Re-exports the public names of an entry module from the packed output.
fn entry_exports(
  graph: &DependencyGraph,
  id: DependencyId,
  exported_names: &mut HashSet<String>,
  namespaces: &mut Vec<DependencyId>,
) -> Result<Vec<ModuleItem>, PackError> {
  let entry = graph.get(id);
  let mut items = Vec::new();
  let mut specifiers = Vec::new();
  for (index, name) in entry.exports.keys().enumerate() {
    if !exported_names.insert(name.clone()) {
      log::warn!(
        "Export \"{}\" of {} is already exported by another entry.",
        name,
        entry.specifier
      );
      continue;
    }
    match graph.resolve_export(id, name)? {
      ResolvedExport::Binding { dependency, local } => {
        let local = graph.get(dependency).binding_name(&local);
        specifiers.push((local, name.clone()));
      }
      ResolvedExport::Namespace { dependency } => {
        let local = format!("{}$ns{}", entry.prefix, index);
        items.push(const_item(
          &local,
          namespace_lookup(&graph.get(dependency).runtime_key()),
        ));
        specifiers.push((local, name.clone()));
        namespaces.push(dependency);
      }
    }
  }
  if !specifiers.is_empty() {
    items.push(export_named_item(specifiers));
  }
  Ok(items)
}

/// Packs the modules reachable from the entries into a single module.
pub fn pack_graph<S: AsRef<str>>(
  roots: &[S],
  source: &ModuleSource,
  config: &PackConfig,
) -> Result<Module, PackError> {
  if roots.is_empty() {
    return Err(PackError::NoFiles);
  }
  for root in roots {
    if resolve_entry(root.as_ref()).is_none() {
      return Err(PackError::InvalidUrl(root.as_ref().to_string()));
    }
  }

  let mut graph = DependencyGraph::new(config.parse_dynamic);
  for root in roots {
    graph.add_entry(source, root.as_ref())?;
  }
  graph.propagate_export_all();

  let retain_exports = config.export_primary && !config.no_exports;
  let mut exported_names = HashSet::new();
  let mut metas = Vec::new();
  let mut uses_include = false;
  let mut body = Vec::new();
  for id in graph.evaluation_order().to_vec() {
    let Some(parsed) = graph.take_module(id) else {
      continue;
    };
    let rewritten =
      rewrite_dependency(&graph, id, parsed, config.parse_dynamic)?;
    let mut namespaces = rewritten.namespaces;
    uses_include |= rewritten.uses_include;
    body.extend(rewritten.items);
    let dependency = graph.get(id);
    if rewritten.uses_import_meta {
      metas.push((
        import_meta_name(&dependency.prefix),
        dependency.specifier.clone(),
      ));
    }
    if retain_exports && dependency.is_entry {
      body.extend(entry_exports(
        &graph,
        id,
        &mut exported_names,
        &mut namespaces,
      )?);
    }
    for namespace in namespaces {
      graph.get_mut(namespace).namespace_requirement = true;
    }
  }

  let bare = config.bare || config.no_exports;
  let mut items = Vec::new();
  if !metas.is_empty() {
    items.push(origin_declaration(&metas));
  }
  let needs_table = !bare
    || config.parse_dynamic
    || graph
      .dependencies()
      .any(|(_, dependency)| dependency.namespace_requirement);
  if needs_table {
    let table = build_loader_table(&graph, bare)?;
    if !table.is_empty() || uses_include {
      items.extend(loader_items(&graph, &table));
    }
  }
  let prelude = items.len();
  items.extend(body);
  if config.reorder {
    reorder_statements(&mut items[prelude..]);
  }
  log::debug!(
    "Packed {} modules into {} items.",
    graph.len(),
    items.len()
  );
  Ok(Module {
    span: DUMMY_SP,
    body: items,
    shebang: None,
  })
}
