// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashMap;
use std::collections::HashSet;

use deno_ast::swc::ast::*;
use deno_ast::swc::common::DUMMY_SP;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitMutWith;
use deno_ast::swc::ecma_visit::VisitWith;
use indexmap::IndexMap;

use crate::ast::ParsedModule;
use crate::graph::collect_dynamic_imports;
use crate::graph::prefix_for_index;
use crate::graph::PackError;
use crate::module_specifier::resolve_import;
use crate::module_specifier::runtime_key;
use crate::module_specifier::ModuleSpecifier;
use crate::rename::ImportTarget;
use crate::rename::shadowed_bindings;
use crate::rename::Renamer;
use crate::runtime::include_call;
use crate::runtime::INCLUDE;
use crate::swc_helpers::*;

/// Top-level bindings of a plugin are renamed to `__<name>`.
const PLUGIN_PREFIX: &str = "_";

#[derive(Default)]
struct IdentNames(HashSet<String>);

impl Visit for IdentNames {
  fn visit_ident(&mut self, ident: &Ident) {
    self.0.insert(ident.sym.to_string());
  }
}

fn resolve_key(
  text: &str,
  specifier: &ModuleSpecifier,
) -> Result<String, PackError> {
  resolve_import(text, specifier)
    .map(|resolved| runtime_key(&resolved))
    .map_err(|source| PackError::InvalidSpecifier {
      specifier: text.to_string(),
      referrer: specifier.clone(),
      source,
    })
}

/// Rewrites a module so its static imports are fetched through the runtime
/// loader installed by a packed bundle instead of being imported.
///
/// Each imported module is bound to a short object name, and references to
/// import bindings become property reads on that object, so they stay live.
pub fn transform_plugin(
  parsed: &ParsedModule,
  specifier: &ModuleSpecifier,
) -> Result<Module, PackError> {
  let module = &parsed.module;
  let mut taken_names = IdentNames::default();
  module.visit_with(&mut taken_names);
  let taken_names = taken_names.0;

  // runtime key -> object name
  let mut objects = IndexMap::<String, String>::new();
  let mut next_object = 0;
  let mut imports = HashMap::new();
  let mut body = Vec::with_capacity(module.body.len());
  for item in &module.body {
    let decl = match item {
      ModuleItem::Stmt(stmt) => {
        body.push(ModuleItem::Stmt(stmt.clone()));
        continue;
      }
      ModuleItem::ModuleDecl(decl) => decl,
    };
    match decl {
      ModuleDecl::Import(import) if !import.type_only => {
        let key = resolve_key(&str_value(&import.src), specifier)?;
        let object = match objects.get(&key) {
          Some(object) => object.clone(),
          None => {
            let mut object = prefix_for_index(next_object);
            next_object += 1;
            while taken_names.contains(&object) {
              object = prefix_for_index(next_object);
              next_object += 1;
            }
            objects.insert(key, object.clone());
            object
          }
        };
        for import_specifier in &import.specifiers {
          let (local, target) = match import_specifier {
            ImportSpecifier::Named(named) => {
              if named.is_type_only {
                continue;
              }
              let name = match &named.imported {
                Some(imported) => module_export_name_text(imported),
                None => named.local.sym.to_string(),
              };
              (
                &named.local,
                ImportTarget::Expr(Box::new(member_access(
                  ident_expr(&object),
                  &name,
                ))),
              )
            }
            ImportSpecifier::Default(default) => (
              &default.local,
              ImportTarget::Expr(Box::new(member_expr(
                ident_expr(&object),
                "default",
              ))),
            ),
            ImportSpecifier::Namespace(namespace) => {
              (&namespace.local, ImportTarget::Ident(object.clone()))
            }
          };
          imports.insert(local.sym.to_string(), target);
        }
      }
      ModuleDecl::ExportDecl(export_decl) => {
        body.push(ModuleItem::Stmt(Stmt::Decl(export_decl.decl.clone())));
      }
      ModuleDecl::ExportDefaultDecl(export_default) => {
        match &export_default.decl {
          DefaultDecl::Class(ClassExpr {
            ident: Some(ident),
            class,
          }) => body.push(ModuleItem::Stmt(Stmt::Decl(Decl::Class(
            ClassDecl {
              ident: ident.clone(),
              declare: false,
              class: class.clone(),
            },
          )))),
          DefaultDecl::Fn(FnExpr {
            ident: Some(ident),
            function,
          }) => body.push(ModuleItem::Stmt(Stmt::Decl(Decl::Fn(FnDecl {
            ident: ident.clone(),
            declare: false,
            function: function.clone(),
          })))),
          // anonymous declarations can never be referenced
          _ => {}
        }
      }
      ModuleDecl::ExportDefaultExpr(export_default) => {
        let expr = match &*export_default.expr {
          expr @ (Expr::Object(_) | Expr::Fn(_) | Expr::Class(_)) => {
            paren_expr(expr.clone())
          }
          expr => expr.clone(),
        };
        body.push(expr_item(expr));
      }
      _ => {}
    }
  }

  let mut dynamic_imports = HashMap::new();
  for text in collect_dynamic_imports(module) {
    if !dynamic_imports.contains_key(&text) {
      let key = resolve_key(&text, specifier)?;
      dynamic_imports.insert(text, key);
    }
  }

  let introduced = objects
    .values()
    .cloned()
    .chain([INCLUDE.to_string()]);
  let shadowed = shadowed_bindings(
    &body,
    parsed.top_level_context,
    PLUGIN_PREFIX,
    introduced,
  );
  let mut renamer = Renamer {
    top_level: parsed.top_level_context,
    prefix: PLUGIN_PREFIX,
    imports: &imports,
    shadowed: &shadowed,
    dynamic_imports: Some(&dynamic_imports),
    import_meta: None,
    uses_import_meta: false,
    uses_include: false,
  };
  body.visit_mut_with(&mut renamer);

  let mut items = Vec::with_capacity(body.len() + 1);
  match objects.first() {
    None => {}
    Some((key, object)) if objects.len() == 1 => {
      items.push(const_item(object, await_expr(include_call(str_expr(key)))));
    }
    Some(_) => {
      let names = objects
        .values()
        .map(binding_pat)
        .collect::<Vec<_>>();
      let keys = objects.keys().map(str_expr).collect::<Vec<_>>();
      let all = call_expr(
        member_expr(ident_expr("Promise"), "all"),
        vec![call_expr(
          member_expr(array_expr(keys), "map"),
          vec![ident_expr(INCLUDE)],
        )],
      );
      items.push(const_decl(vec![var_declarator(
        array_pat(names, None),
        await_expr(all),
      )]));
    }
  }
  log::debug!(
    "Plugin {} includes {} modules.",
    specifier,
    objects.len()
  );
  items.extend(body);
  Ok(Module {
    span: DUMMY_SP,
    body: items,
    shebang: None,
  })
}
