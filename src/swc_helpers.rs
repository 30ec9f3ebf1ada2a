// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::*;
use deno_ast::swc::common::DUMMY_SP;

pub fn ident(name: impl AsRef<str>) -> Ident {
  Ident::new_no_ctxt(name.as_ref().into(), DUMMY_SP)
}

pub fn ident_expr(name: impl AsRef<str>) -> Expr {
  Expr::Ident(ident(name))
}

pub fn binding_pat(name: impl AsRef<str>) -> Pat {
  Pat::Ident(BindingIdent {
    id: ident(name),
    type_ann: None,
  })
}

pub fn str_lit(value: impl AsRef<str>) -> Str {
  Str {
    span: DUMMY_SP,
    value: value.as_ref().into(),
    raw: None,
  }
}

pub fn str_expr(value: impl AsRef<str>) -> Expr {
  Expr::Lit(Lit::Str(str_lit(value)))
}

/// Gets the string value of a string literal.
pub fn str_value(value: &Str) -> String {
  value.value.to_string()
}

pub fn module_export_name_text(name: &ModuleExportName) -> String {
  match name {
    ModuleExportName::Ident(ident) => ident.sym.to_string(),
    ModuleExportName::Str(value) => str_value(value),
  }
}

/// Whether the text can be written as a property or export name without
/// quoting. Unlike binding identifiers, reserved words are allowed.
pub fn is_identifier_name(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next().is_some_and(Ident::is_valid_start)
    && chars.all(Ident::is_valid_continue)
}

/// Creates the name used on either side of an `as` in an export specifier.
pub fn module_export_name(name: &str) -> ModuleExportName {
  if is_identifier_name(name) {
    ModuleExportName::Ident(ident(name))
  } else {
    ModuleExportName::Str(str_lit(name))
  }
}

pub fn member_expr(obj: Expr, prop: impl AsRef<str>) -> Expr {
  Expr::Member(MemberExpr {
    span: DUMMY_SP,
    obj: Box::new(obj),
    prop: MemberProp::Ident(IdentName::new(prop.as_ref().into(), DUMMY_SP)),
  })
}

/// Accesses a property that may not be a valid identifier name.
pub fn member_access(obj: Expr, prop: &str) -> Expr {
  if is_identifier_name(prop) {
    member_expr(obj, prop)
  } else {
    Expr::Member(MemberExpr {
      span: DUMMY_SP,
      obj: Box::new(obj),
      prop: MemberProp::Computed(ComputedPropName {
        span: DUMMY_SP,
        expr: Box::new(str_expr(prop)),
      }),
    })
  }
}

fn expr_or_spread(expr: Expr) -> ExprOrSpread {
  ExprOrSpread {
    spread: None,
    expr: Box::new(expr),
  }
}

pub fn call_expr(callee: Expr, args: Vec<Expr>) -> Expr {
  Expr::Call(CallExpr {
    span: DUMMY_SP,
    callee: Callee::Expr(Box::new(callee)),
    args: args.into_iter().map(expr_or_spread).collect(),
    type_args: None,
    ..Default::default()
  })
}

/// `import(<arg>)`
pub fn dynamic_import_expr(arg: Expr) -> Expr {
  Expr::Call(CallExpr {
    span: DUMMY_SP,
    callee: Callee::Import(Import {
      span: DUMMY_SP,
      phase: Default::default(),
    }),
    args: vec![expr_or_spread(arg)],
    type_args: None,
    ..Default::default()
  })
}

pub fn new_expr(callee: Expr, args: Vec<Expr>) -> Expr {
  Expr::New(NewExpr {
    span: DUMMY_SP,
    callee: Box::new(callee),
    args: Some(args.into_iter().map(expr_or_spread).collect()),
    type_args: None,
    ..Default::default()
  })
}

pub fn arrow_expr(params: Vec<Pat>, body: Expr) -> Expr {
  Expr::Arrow(ArrowExpr {
    span: DUMMY_SP,
    params,
    body: Box::new(BlockStmtOrExpr::Expr(Box::new(body))),
    is_async: false,
    is_generator: false,
    type_params: None,
    return_type: None,
    ..Default::default()
  })
}

pub fn array_expr(elems: Vec<Expr>) -> Expr {
  Expr::Array(ArrayLit {
    span: DUMMY_SP,
    elems: elems.into_iter().map(|e| Some(expr_or_spread(e))).collect(),
  })
}

/// `[a, b, ...rest]`
pub fn array_pat(elems: Vec<Pat>, rest: Option<Pat>) -> Pat {
  let mut elems = elems.into_iter().map(Some).collect::<Vec<_>>();
  if let Some(rest) = rest {
    elems.push(Some(Pat::Rest(RestPat {
      span: DUMMY_SP,
      dot3_token: DUMMY_SP,
      arg: Box::new(rest),
      type_ann: None,
    })));
  }
  Pat::Array(ArrayPat {
    span: DUMMY_SP,
    elems,
    optional: false,
    type_ann: None,
  })
}

pub enum ObjectProp {
  KeyValue(String, Expr),
  Shorthand(String),
}

pub fn object_expr(props: Vec<ObjectProp>) -> Expr {
  Expr::Object(ObjectLit {
    span: DUMMY_SP,
    props: props
      .into_iter()
      .map(|prop| {
        let prop = match prop {
          ObjectProp::KeyValue(key, value) => Prop::KeyValue(KeyValueProp {
            key: PropName::Ident(IdentName::new(key.into(), DUMMY_SP)),
            value: Box::new(value),
          }),
          ObjectProp::Shorthand(name) => Prop::Shorthand(ident(name)),
        };
        PropOrSpread::Prop(Box::new(prop))
      })
      .collect(),
  })
}

pub fn bool_expr(value: bool) -> Expr {
  Expr::Lit(Lit::Bool(Bool {
    span: DUMMY_SP,
    value,
  }))
}

pub fn bin_expr(op: BinaryOp, left: Expr, right: Expr) -> Expr {
  Expr::Bin(BinExpr {
    span: DUMMY_SP,
    op,
    left: Box::new(left),
    right: Box::new(right),
  })
}

pub fn await_expr(arg: Expr) -> Expr {
  Expr::Await(AwaitExpr {
    span: DUMMY_SP,
    arg: Box::new(arg),
  })
}

pub fn paren_expr(expr: Expr) -> Expr {
  Expr::Paren(ParenExpr {
    span: DUMMY_SP,
    expr: Box::new(expr),
  })
}

pub fn var_declarator(name: Pat, init: Expr) -> VarDeclarator {
  VarDeclarator {
    span: DUMMY_SP,
    name,
    init: Some(Box::new(init)),
    definite: false,
  }
}

pub fn const_stmt(decls: Vec<VarDeclarator>) -> Stmt {
  Stmt::Decl(Decl::Var(Box::new(VarDecl {
    span: DUMMY_SP,
    kind: VarDeclKind::Const,
    declare: false,
    decls,
    ..Default::default()
  })))
}

pub fn const_decl(decls: Vec<VarDeclarator>) -> ModuleItem {
  ModuleItem::Stmt(const_stmt(decls))
}

/// `const <name> = <init>;`
pub fn const_item(name: impl AsRef<str>, init: Expr) -> ModuleItem {
  const_decl(vec![var_declarator(binding_pat(name), init)])
}

pub fn expr_stmt(expr: Expr) -> Stmt {
  Stmt::Expr(ExprStmt {
    span: DUMMY_SP,
    expr: Box::new(expr),
  })
}

pub fn expr_item(expr: Expr) -> ModuleItem {
  ModuleItem::Stmt(expr_stmt(expr))
}

/// `export { <local> as <exported>, ... };`
pub fn export_named_item(specifiers: Vec<(String, String)>) -> ModuleItem {
  ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(NamedExport {
    span: DUMMY_SP,
    specifiers: specifiers
      .into_iter()
      .map(|(local, exported)| {
        let exported = if local == exported {
          None
        } else {
          Some(module_export_name(&exported))
        };
        ExportSpecifier::Named(ExportNamedSpecifier {
          span: DUMMY_SP,
          orig: ModuleExportName::Ident(ident(local)),
          exported,
          is_type_only: false,
        })
      })
      .collect(),
    src: None,
    type_only: false,
    with: None,
  }))
}

/// Checks whether an expression reached through member accesses contains a
/// call, which would bind to a `new` when used as its callee.
pub fn has_call_in_member_chain(expr: &Expr) -> bool {
  match expr {
    Expr::Call(_) => true,
    Expr::Member(member) => has_call_in_member_chain(&member.obj),
    _ => false,
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn export_names() {
    assert!(matches!(
      module_export_name("value"),
      ModuleExportName::Ident(_)
    ));
    assert!(matches!(
      module_export_name("default"),
      ModuleExportName::Ident(_)
    ));
    assert!(matches!(
      module_export_name("some-value"),
      ModuleExportName::Str(_)
    ));
    assert_eq!(module_export_name_text(&module_export_name("a b")), "a b");
  }

  #[test]
  fn member_chain_calls() {
    let call = call_expr(ident_expr("f"), vec![]);
    assert!(has_call_in_member_chain(&member_expr(call, "value")));
    assert!(!has_call_in_member_chain(&member_expr(
      ident_expr("f"),
      "value"
    )));
  }
}
