// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::*;
use deno_ast::swc::common::Spanned;

use super::declare_modifier::ensure_declare;
use super::placement::Placed;
use super::placement::VisitResult;
use crate::module_specifier::specifier_stem;
use crate::swc_helpers::decl_binding_idents;
use crate::swc_helpers::export_specifier;
use crate::swc_helpers::named_export;
use crate::ModuleSpecifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonymousDefaultKind {
  Class,
  Function,
}

/// Derives the name given to an anonymous default export from the file
/// stem, for example `myUtilsClass` for `my-utils.d.ts`.
pub fn anonymous_default_name(
  specifier: &ModuleSpecifier,
  kind: AnonymousDefaultKind,
) -> String {
  let mut name = String::new();
  let parts = specifier_stem(specifier)
    .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '$')
    .filter(|part| !part.is_empty());
  for (i, part) in parts.enumerate() {
    let mut chars = part.chars();
    if let Some(first) = chars.next() {
      if i == 0 {
        name.extend(first.to_lowercase());
      } else {
        name.extend(first.to_uppercase());
      }
      name.push_str(chars.as_str());
    }
  }
  if name.is_empty() {
    name.push_str("default");
  } else if name.starts_with(|c: char| c.is_ascii_digit()) {
    name.insert(0, '_');
  }
  name.push_str(match kind {
    AnonymousDefaultKind::Class => "Class",
    AnonymousDefaultKind::Function => "Function",
  });
  name
}

/// Converts an exported declaration into the plain declaration followed by
/// an export statement naming it.
///
/// Anonymous default exports get a name derived from the file name.
pub fn promote_to_export_declaration(
  item: &ModuleItem,
  specifier: &ModuleSpecifier,
) -> Placed<ModuleItem> {
  let ModuleItem::ModuleDecl(module_decl) = item else {
    return Placed::unchanged();
  };
  match module_decl {
    ModuleDecl::ExportDecl(export_decl) => {
      let idents = decl_binding_idents(&export_decl.decl);
      if idents.is_empty() {
        return Placed::unchanged();
      }
      let decl = ensure_declare(&export_decl.decl).into_owned();
      let specifiers = idents
        .iter()
        .map(|ident| export_specifier(&ident.sym, &ident.sym))
        .collect();
      Placed::new(VisitResult::Replaced(ModuleItem::Stmt(Stmt::Decl(decl))))
        .with_append([named_export(specifiers, None)])
    }
    ModuleDecl::ExportDefaultDecl(default_decl) => {
      let (decl, ident) = match &default_decl.decl {
        DefaultDecl::Class(class_expr) => {
          let ident = class_expr.ident.clone().unwrap_or_else(|| {
            Ident::new_no_ctxt(
              anonymous_default_name(specifier, AnonymousDefaultKind::Class)
                .into(),
              class_expr.class.span,
            )
          });
          let decl = Decl::Class(ClassDecl {
            ident: ident.clone(),
            declare: true,
            class: class_expr.class.clone(),
          });
          (decl, ident)
        }
        DefaultDecl::Fn(fn_expr) => {
          let ident = fn_expr.ident.clone().unwrap_or_else(|| {
            Ident::new_no_ctxt(
              anonymous_default_name(specifier, AnonymousDefaultKind::Function)
                .into(),
              fn_expr.function.span,
            )
          });
          let decl = Decl::Fn(FnDecl {
            ident: ident.clone(),
            declare: true,
            function: fn_expr.function.clone(),
          });
          (decl, ident)
        }
        DefaultDecl::TsInterfaceDecl(interface_decl) => (
          Decl::TsInterface(interface_decl.clone()),
          interface_decl.id.clone(),
        ),
      };
      Placed::new(VisitResult::Replaced(ModuleItem::Stmt(Stmt::Decl(decl))))
        .with_append([named_export(
          vec![export_specifier(&ident.sym, "default")],
          None,
        )])
    }
    ModuleDecl::TsImportEquals(import_equals) if import_equals.is_export => {
      let name = import_equals.id.sym.to_string();
      let decl = TsImportEqualsDecl {
        is_export: false,
        ..(**import_equals).clone()
      };
      Placed::new(VisitResult::Replaced(ModuleItem::ModuleDecl(
        ModuleDecl::TsImportEquals(Box::new(decl)),
      )))
      .with_append([named_export(vec![export_specifier(&name, &name)], None)])
    }
    _ => Placed::unchanged(),
  }
}

/// Gets if the item is an anonymous `export default class` or
/// `export default function`.
pub fn is_anonymous_default(item: &ModuleItem) -> bool {
  match item {
    ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(default_decl)) => {
      match &default_decl.decl {
        DefaultDecl::Class(class_expr) => class_expr.ident.is_none(),
        DefaultDecl::Fn(fn_expr) => fn_expr.ident.is_none(),
        DefaultDecl::TsInterfaceDecl(_) => false,
      }
    }
    _ => false,
  }
}

/// Gets the span start used to identify the declaration bound by an
/// anonymous default export.
pub fn anonymous_default_span_start(default_decl: &DefaultDecl) -> u32 {
  match default_decl {
    DefaultDecl::Class(class_expr) => class_expr.class.span.lo.0,
    DefaultDecl::Fn(fn_expr) => fn_expr.function.span.lo.0,
    DefaultDecl::TsInterfaceDecl(interface_decl) => {
      interface_decl.span().lo.0
    }
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::ast::parse_declaration_text;
  use crate::swc_helpers::emit_module;

  fn url(text: &str) -> ModuleSpecifier {
    ModuleSpecifier::parse(text).unwrap()
  }

  fn promote_all(specifier: &str, text: &str) -> String {
    let specifier = url(specifier);
    let mut module = parse_declaration_text(specifier.as_str(), text);
    let mut body = Vec::new();
    for item in module.body.drain(..) {
      promote_to_export_declaration(&item, &specifier).splice(item, &mut body);
    }
    module.body = body;
    emit_module(&module).unwrap()
  }

  fn normalize(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
  }

  #[test]
  fn anonymous_default_names() {
    let cases = [
      ("file:///src/my-utils.d.ts", AnonymousDefaultKind::Class, "myUtilsClass"),
      ("file:///src/index.d.ts", AnonymousDefaultKind::Function, "indexFunction"),
      ("file:///src/Foo.d.mts", AnonymousDefaultKind::Class, "fooClass"),
      ("file:///src/1st.d.ts", AnonymousDefaultKind::Class, "_1stClass"),
    ];
    for (specifier, kind, expected) in cases {
      assert_eq!(anonymous_default_name(&url(specifier), kind), expected);
    }
  }

  #[test]
  fn promotes_exported_declarations() {
    let output = promote_all(
      "file:///foo.d.ts",
      "declare class A {}\nexport declare class B {}\nexport interface C {}\nexport declare const d: string, e: number;",
    );
    assert_eq!(
      normalize(&output),
      normalize(
        "declare class A {\n}\ndeclare class B {\n}\nexport { B };\ninterface C {\n}\nexport { C };\ndeclare const d: string, e: number;\nexport { d, e };\n"
      )
    );
  }

  #[test]
  fn promotes_anonymous_defaults() {
    let output = promote_all(
      "file:///foo.d.ts",
      "export default class {}",
    );
    assert_eq!(
      normalize(&output),
      normalize("declare class fooClass {\n}\nexport { fooClass as default };\n")
    );
    let output = promote_all(
      "file:///foo.d.ts",
      "export default function(): void;",
    );
    assert!(output.contains("fooFunction"), "{}", output);
    assert!(
      normalize(&output).contains("export{fooFunctionasdefault}"),
      "{}",
      output
    );
  }

  #[test]
  fn not_exported_is_unchanged() {
    let specifier = url("file:///foo.d.ts");
    let module =
      parse_declaration_text(specifier.as_str(), "declare class A {}");
    let placed = promote_to_export_declaration(&module.body[0], &specifier);
    assert!(matches!(placed.result, VisitResult::Unchanged));
    assert!(placed.prepend.is_empty() && placed.append.is_empty());
  }
}
