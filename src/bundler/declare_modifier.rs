// Copyright 2018-2024 the Deno authors. MIT license.

//! Normalization of the `declare` modifier on top level declarations.
//!
//! Both passes return [`Cow::Borrowed`] when the declaration already has
//! the requested shape so callers can keep the original node.

use std::borrow::Cow;

use deno_ast::swc::ast::*;

/// Adds the `declare` modifier to class, function, namespace, variable and
/// enum declarations.
pub fn ensure_declare(decl: &Decl) -> Cow<'_, Decl> {
  set_declare(decl, true)
}

/// Removes the `declare` modifier from class, function, namespace,
/// variable and enum declarations.
pub fn ensure_no_declare(decl: &Decl) -> Cow<'_, Decl> {
  set_declare(decl, false)
}

fn set_declare(decl: &Decl, declare: bool) -> Cow<'_, Decl> {
  match decl {
    Decl::Class(class_decl) if class_decl.declare != declare => {
      Cow::Owned(Decl::Class(ClassDecl {
        declare,
        ..class_decl.clone()
      }))
    }
    Decl::Fn(fn_decl) if fn_decl.declare != declare => {
      Cow::Owned(Decl::Fn(FnDecl {
        declare,
        ..fn_decl.clone()
      }))
    }
    Decl::Var(var_decl) if var_decl.declare != declare => {
      Cow::Owned(Decl::Var(Box::new(VarDecl {
        declare,
        ..(**var_decl).clone()
      })))
    }
    Decl::TsEnum(enum_decl) if enum_decl.declare != declare => {
      Cow::Owned(Decl::TsEnum(Box::new(TsEnumDecl {
        declare,
        ..(**enum_decl).clone()
      })))
    }
    // `declare global` and `declare module "x"` always keep the modifier
    Decl::TsModule(module_decl)
      if module_decl.declare != declare
        && !module_decl.global
        && matches!(module_decl.id, TsModuleName::Ident(_)) =>
    {
      Cow::Owned(Decl::TsModule(Box::new(TsModuleDecl {
        declare,
        ..(**module_decl).clone()
      })))
    }
    _ => Cow::Borrowed(decl),
  }
}

/// Ensures every top level declaration statement is `declare`d.
///
/// Exported declarations are left alone since `export` already makes them
/// ambient in a declaration file.
pub fn ensure_declare_module_item(item: &ModuleItem) -> Cow<'_, ModuleItem> {
  match item {
    ModuleItem::Stmt(Stmt::Decl(decl)) => match ensure_declare(decl) {
      Cow::Borrowed(_) => Cow::Borrowed(item),
      Cow::Owned(decl) => Cow::Owned(ModuleItem::Stmt(Stmt::Decl(decl))),
    },
    _ => Cow::Borrowed(item),
  }
}

/// Removes the `declare` modifier from top level declarations, including
/// exported ones.
pub fn ensure_no_declare_module_item(
  item: &ModuleItem,
) -> Cow<'_, ModuleItem> {
  match item {
    ModuleItem::Stmt(Stmt::Decl(decl)) => match ensure_no_declare(decl) {
      Cow::Borrowed(_) => Cow::Borrowed(item),
      Cow::Owned(decl) => Cow::Owned(ModuleItem::Stmt(Stmt::Decl(decl))),
    },
    ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export_decl)) => {
      match ensure_no_declare(&export_decl.decl) {
        Cow::Borrowed(_) => Cow::Borrowed(item),
        Cow::Owned(decl) => {
          Cow::Owned(ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(
            ExportDecl {
              span: export_decl.span,
              decl,
            },
          )))
        }
      }
    }
    _ => Cow::Borrowed(item),
  }
}

/// Applies `f` to an owned item, keeping the item when nothing changed.
pub fn map_owned_module_item(
  item: ModuleItem,
  f: impl Fn(&ModuleItem) -> Cow<'_, ModuleItem>,
) -> ModuleItem {
  let changed = match f(&item) {
    Cow::Owned(new_item) => Some(new_item),
    Cow::Borrowed(_) => None,
  };
  changed.unwrap_or(item)
}

/// Applies `f` to every item, only allocating a new list when some item
/// changed.
pub fn map_module_items<'a>(
  items: &'a [ModuleItem],
  f: impl Fn(&ModuleItem) -> Cow<'_, ModuleItem>,
) -> Cow<'a, [ModuleItem]> {
  let mut changed: Option<Vec<ModuleItem>> = None;
  for (i, item) in items.iter().enumerate() {
    match f(item) {
      Cow::Borrowed(_) => {
        if let Some(changed) = &mut changed {
          changed.push(item.clone());
        }
      }
      Cow::Owned(new_item) => {
        let changed =
          changed.get_or_insert_with(|| items[..i].to_vec());
        changed.push(new_item);
      }
    }
  }
  match changed {
    Some(items) => Cow::Owned(items),
    None => Cow::Borrowed(items),
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::ast::parse_declaration_text;

  fn first_decl(text: &str) -> Decl {
    let module = parse_declaration_text("file:///a.d.ts", text);
    match module.body.into_iter().next().unwrap() {
      ModuleItem::Stmt(Stmt::Decl(decl)) => decl,
      ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export_decl)) => {
        export_decl.decl
      }
      other => panic!("unexpected item: {:?}", other),
    }
  }

  fn is_declare(decl: &Decl) -> bool {
    match decl {
      Decl::Class(d) => d.declare,
      Decl::Fn(d) => d.declare,
      Decl::Var(d) => d.declare,
      Decl::TsEnum(d) => d.declare,
      Decl::TsModule(d) => d.declare,
      _ => false,
    }
  }

  #[test]
  fn already_declared_is_identity() {
    let decl = first_decl("declare class Foo<T> { a: T; }");
    let result = ensure_declare(&decl);
    assert!(matches!(result, Cow::Borrowed(_)));
    assert!(std::ptr::eq(result.as_ref(), &decl));
  }

  #[test]
  fn adds_and_removes_modifier() {
    let texts = [
      "export class Foo { a: string; }",
      "export function foo(): void;",
      "export const a: string;",
      "export enum E { A }",
      "export namespace N { const a: string; }",
    ];
    for text in texts {
      let decl = first_decl(text);
      assert!(!is_declare(&decl), "{}", text);
      let declared = ensure_declare(&decl).into_owned();
      assert!(is_declare(&declared), "{}", text);
      // spans survive
      assert_eq!(
        deno_ast::swc::common::Spanned::span(&declared),
        deno_ast::swc::common::Spanned::span(&decl)
      );
      let undeclared = ensure_no_declare(&declared);
      assert!(matches!(undeclared, Cow::Owned(_)));
      assert_eq!(undeclared.as_ref(), &decl);
      assert!(matches!(ensure_declare(&declared), Cow::Borrowed(_)));
    }
  }

  #[test]
  fn interfaces_and_global_untouched() {
    let decl = first_decl("interface Foo { a: string; }");
    assert!(matches!(ensure_declare(&decl), Cow::Borrowed(_)));
    let decl = first_decl("declare global { interface Window {} }");
    assert!(matches!(ensure_no_declare(&decl), Cow::Borrowed(_)));
  }

  #[test]
  fn module_items_keep_identity_when_unchanged() {
    let module = parse_declaration_text(
      "file:///a.d.ts",
      "declare class A {}\ninterface B {}\nexport declare class C {}",
    );
    let items = map_module_items(&module.body, ensure_declare_module_item);
    assert!(matches!(items, Cow::Borrowed(_)));

    let module = parse_declaration_text(
      "file:///a.d.ts",
      "declare class A {}\nexport declare function b(): void;",
    );
    let items =
      map_module_items(&module.body, ensure_no_declare_module_item);
    let items = items.into_owned();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| match item {
      ModuleItem::Stmt(Stmt::Decl(decl)) => !is_declare(decl),
      ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(e)) => !is_declare(&e.decl),
      _ => false,
    }));
  }
}
