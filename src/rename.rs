// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashMap;
use std::collections::HashSet;

use deno_ast::swc::ast::*;
use deno_ast::swc::common::SyntaxContext;
use deno_ast::swc::common::DUMMY_SP;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitMut;
use deno_ast::swc::ecma_visit::VisitMutWith;
use deno_ast::swc::ecma_visit::VisitWith;
use indexmap::IndexSet;

use crate::ast::ParsedModule;
use crate::graph::dynamic_import_text;
use crate::graph::DependencyGraph;
use crate::graph::DependencyId;
use crate::graph::PackError;
use crate::graph::ResolvedExport;
use crate::runtime::namespace_lookup;
use crate::runtime::IMPORTS;
use crate::runtime::INCLUDE;
use crate::swc_helpers::binding_pat;
use crate::swc_helpers::const_stmt;
use crate::swc_helpers::has_call_in_member_chain;
use crate::swc_helpers::ident_expr;
use crate::swc_helpers::paren_expr;
use crate::swc_helpers::str_expr;
use crate::swc_helpers::var_declarator;

/// What references to an import binding become.
#[derive(Debug, Clone)]
pub enum ImportTarget {
  /// The identifier is renamed.
  Ident(String),
  /// The reference is replaced by the expression.
  Expr(Box<Expr>),
}

/// Renames the top-level bindings of a module and redirects references to
/// its imports.
///
/// Identifiers are recognized as top-level bindings by their syntax context,
/// so shadowing bindings in nested scopes are left alone.
pub struct Renamer<'a> {
  pub top_level: SyntaxContext,
  /// Top-level bindings are renamed to `<prefix>_<name>`.
  pub prefix: &'a str,
  pub imports: &'a HashMap<String, ImportTarget>,
  /// New names for bindings in nested scopes that would otherwise capture
  /// references to renamed top-level bindings.
  pub shadowed: &'a HashMap<Id, String>,
  /// When set, `import()` calls are redirected to the runtime loader, with
  /// string literal specifiers mapped to their runtime keys.
  pub dynamic_imports: Option<&'a HashMap<String, String>>,
  /// When set, `import.meta` is replaced by this identifier.
  pub import_meta: Option<&'a str>,
  pub uses_import_meta: bool,
  pub uses_include: bool,
}

impl<'a> Renamer<'a> {
  fn target(&self, ident: &Ident) -> Option<ImportTarget> {
    if ident.ctxt != self.top_level {
      return self
        .shadowed
        .get(&ident.to_id())
        .cloned()
        .map(ImportTarget::Ident);
    }
    match self.imports.get(&*ident.sym) {
      Some(target) => Some(target.clone()),
      None => Some(ImportTarget::Ident(format!(
        "{}_{}",
        self.prefix, ident.sym
      ))),
    }
  }

  fn target_expr(target: ImportTarget) -> Expr {
    match target {
      ImportTarget::Ident(name) => ident_expr(name),
      ImportTarget::Expr(expr) => *expr,
    }
  }
}

impl<'a> VisitMut for Renamer<'a> {
  fn visit_mut_ident(&mut self, ident: &mut Ident) {
    if let Some(ImportTarget::Ident(name)) = self.target(ident) {
      ident.sym = name.into();
    }
  }

  fn visit_mut_expr(&mut self, expr: &mut Expr) {
    match expr {
      Expr::Ident(ident) => {
        if let Some(ImportTarget::Expr(replacement)) = self.target(ident) {
          *expr = *replacement;
          return;
        }
      }
      Expr::MetaProp(MetaPropExpr {
        kind: MetaPropKind::ImportMeta,
        ..
      }) => {
        if let Some(name) = self.import_meta {
          self.uses_import_meta = true;
          *expr = ident_expr(name);
          return;
        }
      }
      _ => {}
    }
    expr.visit_mut_children_with(self);
  }

  fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
    call.visit_mut_children_with(self);
    let Some(dynamic_imports) = self.dynamic_imports else {
      return;
    };
    if !matches!(call.callee, Callee::Import(_)) {
      return;
    }
    if let Some(text) = dynamic_import_text(call) {
      let Some(key) = dynamic_imports.get(&text) else {
        return;
      };
      call.args[0].expr = Box::new(str_expr(key));
    }
    call.callee = Callee::Expr(Box::new(ident_expr(INCLUDE)));
    self.uses_include = true;
  }

  fn visit_mut_new_expr(&mut self, new_expr: &mut NewExpr) {
    new_expr.visit_mut_children_with(self);
    if has_call_in_member_chain(&new_expr.callee) {
      let callee = std::mem::replace(
        &mut new_expr.callee,
        Box::new(Expr::Invalid(Invalid { span: DUMMY_SP })),
      );
      new_expr.callee = Box::new(paren_expr(*callee));
    }
  }

  fn visit_mut_prop(&mut self, prop: &mut Prop) {
    if let Prop::Shorthand(ident) = prop {
      if let Some(target) = self.target(ident) {
        let key =
          PropName::Ident(IdentName::new(ident.sym.clone(), ident.span));
        *prop = Prop::KeyValue(KeyValueProp {
          key,
          value: Box::new(Self::target_expr(target)),
        });
        return;
      }
    }
    prop.visit_mut_children_with(self);
  }

  fn visit_mut_object_pat_prop(&mut self, prop: &mut ObjectPatProp) {
    if let ObjectPatProp::Assign(assign) = prop {
      if let Some(ImportTarget::Ident(name)) = self.target(&assign.key.id) {
        let key = PropName::Ident(IdentName::new(
          assign.key.id.sym.clone(),
          DUMMY_SP,
        ));
        let mut default_value = assign.value.take();
        if let Some(default_value) = &mut default_value {
          default_value.visit_mut_with(self);
        }
        let value = match default_value {
          Some(default_value) => Pat::Assign(AssignPat {
            span: DUMMY_SP,
            left: Box::new(binding_pat(name)),
            right: default_value,
          }),
          None => binding_pat(name),
        };
        *prop = ObjectPatProp::KeyValue(KeyValuePatProp {
          key,
          value: Box::new(value),
        });
        return;
      }
    }
    prop.visit_mut_children_with(self);
  }
}

#[derive(Default)]
struct ScopeNames {
  top_level: SyntaxContext,
  names: HashSet<String>,
  top_level_names: IndexSet<String>,
  nested_bindings: IndexSet<Id>,
}

impl ScopeNames {
  fn binding(&mut self, ident: &Ident) {
    if ident.ctxt != self.top_level {
      self.nested_bindings.insert(ident.to_id());
    }
  }
}

impl Visit for ScopeNames {
  fn visit_ident(&mut self, ident: &Ident) {
    self.names.insert(ident.sym.to_string());
    if ident.ctxt == self.top_level {
      self.top_level_names.insert(ident.sym.to_string());
    }
  }

  fn visit_binding_ident(&mut self, binding: &BindingIdent) {
    self.binding(&binding.id);
    binding.visit_children_with(self);
  }

  fn visit_fn_decl(&mut self, fn_decl: &FnDecl) {
    self.binding(&fn_decl.ident);
    fn_decl.visit_children_with(self);
  }

  fn visit_class_decl(&mut self, class_decl: &ClassDecl) {
    self.binding(&class_decl.ident);
    class_decl.visit_children_with(self);
  }

  fn visit_fn_expr(&mut self, fn_expr: &FnExpr) {
    if let Some(ident) = &fn_expr.ident {
      self.binding(ident);
    }
    fn_expr.visit_children_with(self);
  }

  fn visit_class_expr(&mut self, class_expr: &ClassExpr) {
    if let Some(ident) = &class_expr.ident {
      self.binding(ident);
    }
    class_expr.visit_children_with(self);
  }
}

/// Picks new names for the bindings of nested scopes whose names collide
/// with the names the renamer introduces: `<prefix>_<name>` for each
/// top-level binding, plus `introduced`. A nested binding is renamed to
/// `<name>$<n>` with the smallest `n` leaving the name unused.
pub fn shadowed_bindings(
  items: &[ModuleItem],
  top_level: SyntaxContext,
  prefix: &str,
  introduced: impl IntoIterator<Item = String>,
) -> HashMap<Id, String> {
  let mut scope_names = ScopeNames {
    top_level,
    ..Default::default()
  };
  items.visit_with(&mut scope_names);
  let mut generated = scope_names
    .top_level_names
    .iter()
    .map(|name| format!("{}_{}", prefix, name))
    .collect::<HashSet<_>>();
  generated.extend(introduced);

  let mut taken = scope_names.names;
  taken.extend(generated.iter().cloned());
  let mut renames = HashMap::new();
  for id in scope_names.nested_bindings {
    if !generated.contains(&*id.0) {
      continue;
    }
    let mut index = 1;
    let name = loop {
      let name = format!("{}${}", id.0, index);
      if !taken.contains(&name) {
        break name;
      }
      index += 1;
    };
    log::debug!("Renaming nested binding {} to {}.", id.0, name);
    taken.insert(name.clone());
    renames.insert(id, name);
  }
  renames
}

fn default_ident(top_level: SyntaxContext) -> Ident {
  Ident::new("default".into(), DUMMY_SP, top_level)
}

/// Replaces the module declarations of a module with the statements they
/// declare. Default exports without a name are bound to `default` in the
/// top-level scope, so they get renamed with the rest of the module.
fn unwrap_module_item(
  item: ModuleItem,
  top_level: SyntaxContext,
) -> Option<ModuleItem> {
  let decl = match item {
    ModuleItem::Stmt(_) => return Some(item),
    ModuleItem::ModuleDecl(decl) => decl,
  };
  let stmt = match decl {
    ModuleDecl::ExportDecl(export_decl) => Stmt::Decl(export_decl.decl),
    ModuleDecl::ExportDefaultDecl(export_default) => match export_default.decl
    {
      DefaultDecl::Class(class_expr) => Stmt::Decl(Decl::Class(ClassDecl {
        ident: class_expr
          .ident
          .unwrap_or_else(|| default_ident(top_level)),
        declare: false,
        class: class_expr.class,
      })),
      DefaultDecl::Fn(fn_expr) => Stmt::Decl(Decl::Fn(FnDecl {
        ident: fn_expr.ident.unwrap_or_else(|| default_ident(top_level)),
        declare: false,
        function: fn_expr.function,
      })),
      DefaultDecl::TsInterfaceDecl(_) => return None,
    },
    ModuleDecl::ExportDefaultExpr(export_default) => {
      let name = Pat::Ident(BindingIdent {
        id: default_ident(top_level),
        type_ann: None,
      });
      const_stmt(vec![var_declarator(name, *export_default.expr)])
    }
    _ => return None,
  };
  Some(ModuleItem::Stmt(stmt))
}

/// A module after its declarations were rewritten for the packed output.
pub struct RewrittenDependency {
  pub items: Vec<ModuleItem>,
  pub uses_import_meta: bool,
  /// The module calls the runtime loader's `include`.
  pub uses_include: bool,
  /// Dependencies whose namespace objects the module references.
  pub namespaces: Vec<DependencyId>,
}

/// The identifier `import.meta` of a module is replaced with.
pub fn import_meta_name(prefix: &str) -> String {
  format!("{}$meta", prefix)
}

/// Rewrites a module of the graph so it can be concatenated with the others.
pub fn rewrite_dependency(
  graph: &DependencyGraph,
  id: DependencyId,
  parsed: ParsedModule,
  parse_dynamic: bool,
) -> Result<RewrittenDependency, PackError> {
  let dependency = graph.get(id);
  let mut namespaces = Vec::new();
  let mut locals = dependency.imports.keys().collect::<Vec<_>>();
  locals.sort();
  let mut imports = HashMap::with_capacity(locals.len());
  for local in locals {
    let target = match graph.resolve_binding(&dependency.imports[local])? {
      ResolvedExport::Binding {
        dependency,
        local: origin,
      } => ImportTarget::Ident(graph.get(dependency).binding_name(&origin)),
      ResolvedExport::Namespace { dependency } => {
        namespaces.push(dependency);
        ImportTarget::Expr(Box::new(namespace_lookup(
          &graph.get(dependency).runtime_key(),
        )))
      }
    };
    imports.insert(local.clone(), target);
  }
  let dynamic_imports = parse_dynamic.then(|| {
    dependency
      .requires
      .iter()
      .map(|(text, id)| (text.clone(), graph.get(*id).runtime_key()))
      .collect::<HashMap<_, _>>()
  });
  let import_meta = import_meta_name(&dependency.prefix);

  let top_level = parsed.top_level_context;
  let mut items = parsed
    .module
    .body
    .into_iter()
    .filter_map(|item| unwrap_module_item(item, top_level))
    .collect::<Vec<_>>();
  let introduced = imports
    .values()
    .filter_map(|target| match target {
      ImportTarget::Ident(name) => Some(name.clone()),
      ImportTarget::Expr(_) => None,
    })
    .chain([import_meta.clone(), IMPORTS.to_string(), INCLUDE.to_string()]);
  let shadowed =
    shadowed_bindings(&items, top_level, &dependency.prefix, introduced);
  let mut renamer = Renamer {
    top_level,
    prefix: &dependency.prefix,
    imports: &imports,
    shadowed: &shadowed,
    dynamic_imports: dynamic_imports.as_ref(),
    import_meta: Some(&import_meta),
    uses_import_meta: false,
    uses_include: false,
  };
  items.visit_mut_with(&mut renamer);
  let uses_import_meta = renamer.uses_import_meta;
  let uses_include = renamer.uses_include;
  Ok(RewrittenDependency {
    items,
    uses_import_meta,
    uses_include,
    namespaces,
  })
}
