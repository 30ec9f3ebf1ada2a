// Copyright 2018-2024 the Deno authors. MIT license.

use std::cmp::Reverse;

use deno_ast::swc::ast::*;

fn is_custom_element_define(expr: &Expr) -> bool {
  let Expr::Call(CallExpr {
    callee: Callee::Expr(callee),
    ..
  }) = expr
  else {
    return false;
  };
  let Expr::Member(MemberExpr {
    obj,
    prop: MemberProp::Ident(prop),
    ..
  }) = &**callee
  else {
    return false;
  };
  &*prop.sym == "define"
    && matches!(&**obj, Expr::Ident(ident) if &*ident.sym == "customElements")
}

fn score(item: &ModuleItem) -> u8 {
  match item {
    ModuleItem::Stmt(Stmt::Decl(decl)) => match decl {
      Decl::Class(_) => 6,
      Decl::Fn(_) => 5,
      Decl::Var(var_decl) => match var_decl.kind {
        VarDeclKind::Let => 3,
        VarDeclKind::Var => 2,
        VarDeclKind::Const => 1,
      },
      Decl::Using(_) => 1,
      _ => 0,
    },
    ModuleItem::Stmt(Stmt::Expr(ExprStmt { expr, .. }))
      if is_custom_element_define(expr) =>
    {
      4
    }
    _ => 0,
  }
}

/// Moves declarations ahead of other statements: classes, then functions,
/// then `customElements.define(...)` calls, then `let`, `var` and `const`
/// declarations. Items of the same kind keep their relative order.
pub fn reorder_statements(items: &mut [ModuleItem]) {
  items.sort_by_key(|item| Reverse(score(item)));
}
