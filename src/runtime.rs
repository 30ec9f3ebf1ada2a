// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::BTreeMap;

use deno_ast::swc::ast::BinaryOp;
use deno_ast::swc::ast::Expr;
use deno_ast::swc::ast::ModuleItem;
use indexmap::IndexSet;

use crate::graph::DependencyGraph;
use crate::graph::DependencyId;
use crate::graph::PackError;
use crate::graph::ResolvedExport;
use crate::module_specifier::ModuleSpecifier;
use crate::swc_helpers::*;

/// The lookup table of packed modules.
pub const IMPORTS: &str = "imports";
/// The global function resolving a runtime key to a module namespace.
pub const INCLUDE: &str = "include";
/// The origin the packed output is served from.
pub const ORIGIN: &str = "o";

/// `imports.get("<key>")`
pub fn namespace_lookup(key: &str) -> Expr {
  call_expr(
    member_expr(ident_expr(IMPORTS), "get"),
    vec![str_expr(key)],
  )
}

/// `include(<arg>)`
pub fn include_call(arg: Expr) -> Expr {
  call_expr(ident_expr(INCLUDE), vec![arg])
}

/// Declares the origin constant and the `import.meta` replacement of each
/// module using it.
///
/// ```js
/// const o = location.origin, a$meta = { url: o + "/main.js" };
/// ```
pub fn origin_declaration(metas: &[(String, ModuleSpecifier)]) -> ModuleItem {
  let mut decls = Vec::with_capacity(metas.len() + 1);
  decls.push(var_declarator(
    binding_pat(ORIGIN),
    member_expr(ident_expr("location"), "origin"),
  ));
  for (name, specifier) in metas {
    let url = if specifier.scheme() == "file" {
      bin_expr(BinaryOp::Add, ident_expr(ORIGIN), str_expr(specifier.path()))
    } else {
      str_expr(specifier.as_str())
    };
    decls.push(var_declarator(
      binding_pat(name),
      object_expr(vec![ObjectProp::KeyValue("url".to_string(), url)]),
    ));
  }
  const_decl(decls)
}

/// The exports of each module served by the runtime loader, keyed and
/// ordered by runtime key.
pub type LoaderTable = BTreeMap<String, Vec<(String, ResolvedExport)>>;

/// Decides which modules the runtime loader serves and resolves their
/// exports.
///
/// Without `bare` every module is served. Otherwise only modules that are
/// imported dynamically or whose namespace is referenced are, along with the
/// modules whose namespaces they export.
pub fn build_loader_table(
  graph: &DependencyGraph,
  bare: bool,
) -> Result<LoaderTable, PackError> {
  let mut members = graph
    .dependencies()
    .filter(|(_, dependency)| {
      !bare || dependency.dynamic_requirement || dependency.namespace_requirement
    })
    .map(|(id, _)| id)
    .collect::<IndexSet<DependencyId>>();
  let mut table = LoaderTable::new();
  let mut index = 0;
  while let Some(id) = members.get_index(index).copied() {
    index += 1;
    let dependency = graph.get(id);
    let mut exports = Vec::with_capacity(dependency.exports.len());
    for name in dependency.exports.keys() {
      let resolved = graph.resolve_export(id, name)?;
      if let ResolvedExport::Namespace { dependency } = &resolved {
        members.insert(*dependency);
      }
      exports.push((name.clone(), resolved));
    }
    table.insert(dependency.runtime_key(), exports);
  }
  log::debug!("Runtime loader serves {} modules.", table.len());
  Ok(table)
}

fn accessor(graph: &DependencyGraph, resolved: &ResolvedExport) -> Expr {
  let value = match resolved {
    ResolvedExport::Binding { dependency, local } => {
      ident_expr(graph.get(*dependency).binding_name(local))
    }
    ResolvedExport::Namespace { dependency } => {
      namespace_lookup(&graph.get(*dependency).runtime_key())
    }
  };
  arrow_expr(vec![], value)
}

/// Creates the lookup table and installs the global `include` function
/// serving it.
///
/// ```js
/// const imports = new Map([["/a.js", ["x", () => a_x]]].map(([url, ...props]) => [url, Object.freeze(Object.defineProperties({}, Object.fromEntries(props.map(([prop, get]) => [prop, { enumerable: true, get }]))))]));
/// Object.defineProperty(globalThis, "include", { value: (url) => Promise.resolve(imports.get(url) ?? import(url)) });
/// ```
pub fn loader_items(
  graph: &DependencyGraph,
  table: &LoaderTable,
) -> Vec<ModuleItem> {
  let entries = table
    .iter()
    .map(|(key, exports)| {
      let mut entry = Vec::with_capacity(exports.len() + 1);
      entry.push(str_expr(key));
      for (name, resolved) in exports {
        entry.push(array_expr(vec![str_expr(name), accessor(graph, resolved)]));
      }
      array_expr(entry)
    })
    .collect::<Vec<_>>();

  let object = || ident_expr("Object");
  let properties = call_expr(
    member_expr(ident_expr("props"), "map"),
    vec![arrow_expr(
      vec![array_pat(vec![binding_pat("prop"), binding_pat("get")], None)],
      array_expr(vec![
        ident_expr("prop"),
        object_expr(vec![
          ObjectProp::KeyValue("enumerable".to_string(), bool_expr(true)),
          ObjectProp::Shorthand("get".to_string()),
        ]),
      ]),
    )],
  );
  let namespace = call_expr(
    member_expr(object(), "freeze"),
    vec![call_expr(
      member_expr(object(), "defineProperties"),
      vec![
        object_expr(vec![]),
        call_expr(member_expr(object(), "fromEntries"), vec![properties]),
      ],
    )],
  );
  let to_namespace = arrow_expr(
    vec![array_pat(
      vec![binding_pat("url")],
      Some(binding_pat("props")),
    )],
    array_expr(vec![ident_expr("url"), namespace]),
  );
  let imports = const_item(
    IMPORTS,
    new_expr(
      ident_expr("Map"),
      vec![call_expr(
        member_expr(array_expr(entries), "map"),
        vec![to_namespace],
      )],
    ),
  );

  let include = arrow_expr(
    vec![binding_pat("url")],
    call_expr(
      member_expr(ident_expr("Promise"), "resolve"),
      vec![bin_expr(
        BinaryOp::NullishCoalescing,
        call_expr(
          member_expr(ident_expr(IMPORTS), "get"),
          vec![ident_expr("url")],
        ),
        dynamic_import_expr(ident_expr("url")),
      )],
    ),
  );
  let install = expr_item(call_expr(
    member_expr(object(), "defineProperty"),
    vec![
      ident_expr("globalThis"),
      str_expr(INCLUDE),
      object_expr(vec![ObjectProp::KeyValue("value".to_string(), include)]),
    ],
  ));

  vec![imports, install]
}
