// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::*;
use serde::Serialize;

use super::deconflict::DeclId;
use super::export_promotion::anonymous_default_name;
use super::export_promotion::anonymous_default_span_start;
use super::export_promotion::AnonymousDefaultKind;
use crate::swc_helpers::decl_binding_idents;
use crate::swc_helpers::module_export_name_text;
use crate::swc_helpers::str_value;
use crate::ModuleSpecifier;

/// A symbol exported by a declaration file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ExportedSymbol {
  /// `export { property_name as name } [from "module_specifier"]` or an
  /// exported declaration.
  Named {
    name: String,
    property_name: String,
    module_specifier: Option<String>,
    decl_id: Option<DeclId>,
  },
  /// `export * from "module_specifier"`
  Namespace { module_specifier: String },
  /// `export * as name from "module_specifier"`
  NamespaceAs {
    name: String,
    module_specifier: String,
  },
}

impl ExportedSymbol {
  /// The name other modules import this symbol with.
  pub fn exported_name(&self) -> Option<&str> {
    match self {
      ExportedSymbol::Named { name, .. }
      | ExportedSymbol::NamespaceAs { name, .. } => Some(name),
      ExportedSymbol::Namespace { .. } => None,
    }
  }
}

/// Records every symbol a declaration file exports, in source order.
pub fn track_exports(
  specifier: &ModuleSpecifier,
  module: &Module,
) -> Vec<ExportedSymbol> {
  let mut symbols = Vec::new();
  for item in &module.body {
    let ModuleItem::ModuleDecl(module_decl) = item else {
      continue;
    };
    match module_decl {
      ModuleDecl::ExportAll(export_all) => {
        symbols.push(ExportedSymbol::Namespace {
          module_specifier: str_value(&export_all.src),
        });
      }
      ModuleDecl::ExportNamed(named_export) => {
        let module_specifier =
          named_export.src.as_ref().map(|src| str_value(src));
        for export_specifier in &named_export.specifiers {
          match export_specifier {
            ExportSpecifier::Named(named) => {
              let property_name = module_export_name_text(&named.orig);
              let name = named
                .exported
                .as_ref()
                .map(module_export_name_text)
                .unwrap_or_else(|| property_name.clone());
              symbols.push(ExportedSymbol::Named {
                name,
                property_name,
                module_specifier: module_specifier.clone(),
                decl_id: None,
              });
            }
            ExportSpecifier::Namespace(namespace) => {
              let Some(module_specifier) = &module_specifier else {
                unreachable!("export * as without a module specifier");
              };
              symbols.push(ExportedSymbol::NamespaceAs {
                name: module_export_name_text(&namespace.name),
                module_specifier: module_specifier.clone(),
              });
            }
            ExportSpecifier::Default(_) => {
              unreachable!("export default from is stage 1")
            }
          }
        }
      }
      ModuleDecl::ExportDecl(export_decl) => {
        for ident in decl_binding_idents(&export_decl.decl) {
          symbols.push(ExportedSymbol::Named {
            name: ident.sym.to_string(),
            property_name: ident.sym.to_string(),
            module_specifier: None,
            decl_id: Some(DeclId::new(specifier, ident.span.lo.0)),
          });
        }
      }
      ModuleDecl::ExportDefaultDecl(default_decl) => {
        let ident = match &default_decl.decl {
          DefaultDecl::Class(class_expr) => class_expr.ident.clone(),
          DefaultDecl::Fn(fn_expr) => fn_expr.ident.clone(),
          DefaultDecl::TsInterfaceDecl(interface_decl) => {
            Some(interface_decl.id.clone())
          }
        };
        let (property_name, start) = match ident {
          Some(ident) => (ident.sym.to_string(), ident.span.lo.0),
          None => {
            let kind = match &default_decl.decl {
              DefaultDecl::Fn(_) => AnonymousDefaultKind::Function,
              _ => AnonymousDefaultKind::Class,
            };
            (
              anonymous_default_name(specifier, kind),
              anonymous_default_span_start(&default_decl.decl),
            )
          }
        };
        symbols.push(ExportedSymbol::Named {
          name: "default".to_string(),
          property_name,
          module_specifier: None,
          decl_id: Some(DeclId::new(specifier, start)),
        });
      }
      ModuleDecl::ExportDefaultExpr(default_expr) => {
        match &*default_expr.expr {
          Expr::Ident(ident) => symbols.push(ExportedSymbol::Named {
            name: "default".to_string(),
            property_name: ident.sym.to_string(),
            module_specifier: None,
            decl_id: None,
          }),
          _ => {
            log::debug!(
              "Not tracking non-identifier default export in {}",
              specifier
            );
          }
        }
      }
      ModuleDecl::TsImportEquals(import_equals) if import_equals.is_export => {
        symbols.push(ExportedSymbol::Named {
          name: import_equals.id.sym.to_string(),
          property_name: import_equals.id.sym.to_string(),
          module_specifier: None,
          decl_id: Some(DeclId::new(specifier, import_equals.id.span.lo.0)),
        });
      }
      ModuleDecl::Import(_)
      | ModuleDecl::TsImportEquals(_)
      | ModuleDecl::TsExportAssignment(_)
      | ModuleDecl::TsNamespaceExport(_) => {}
    }
  }
  symbols
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::ast::parse_declaration_text;

  fn named(
    name: &str,
    property_name: &str,
    module_specifier: Option<&str>,
  ) -> (String, String, Option<String>) {
    (
      name.to_string(),
      property_name.to_string(),
      module_specifier.map(|s| s.to_string()),
    )
  }

  #[test]
  fn tracks_all_export_forms() {
    let specifier = ModuleSpecifier::parse("file:///src/foo.d.ts").unwrap();
    let module = parse_declaration_text(
      specifier.as_str(),
      r#"export * from "./a";
export * as NS from "./b";
export { c as d, e } from "./c";
declare class Local {}
export { Local as Renamed };
export declare class A {}
export declare function f(): void;
export declare const g: string, h: number;
export interface I {}
export type T = string;
export declare enum E { A }
export declare namespace N {}
export import Alias = N;
export default class {}
declare global { interface Window {} }
"#,
    );
    let symbols = track_exports(&specifier, &module);
    assert_eq!(
      symbols[0],
      ExportedSymbol::Namespace {
        module_specifier: "./a".to_string()
      }
    );
    assert_eq!(
      symbols[1],
      ExportedSymbol::NamespaceAs {
        name: "NS".to_string(),
        module_specifier: "./b".to_string()
      }
    );
    let named_symbols = symbols[2..]
      .iter()
      .map(|symbol| match symbol {
        ExportedSymbol::Named {
          name,
          property_name,
          module_specifier,
          ..
        } => (name.clone(), property_name.clone(), module_specifier.clone()),
        other => panic!("unexpected {:?}", other),
      })
      .collect::<Vec<_>>();
    assert_eq!(
      named_symbols,
      vec![
        named("d", "c", Some("./c")),
        named("e", "e", Some("./c")),
        named("Renamed", "Local", None),
        named("A", "A", None),
        named("f", "f", None),
        named("g", "g", None),
        named("h", "h", None),
        named("I", "I", None),
        named("T", "T", None),
        named("E", "E", None),
        named("N", "N", None),
        named("Alias", "Alias", None),
        named("default", "fooClass", None),
      ]
    );
  }

  #[test]
  fn default_exports() {
    let specifier = ModuleSpecifier::parse("file:///src/foo.d.ts").unwrap();
    let module = parse_declaration_text(
      specifier.as_str(),
      "declare class Foo {}\nexport default Foo;",
    );
    let symbols = track_exports(&specifier, &module);
    assert_eq!(
      symbols,
      vec![ExportedSymbol::Named {
        name: "default".to_string(),
        property_name: "Foo".to_string(),
        module_specifier: None,
        decl_id: None,
      }]
    );

    let module = parse_declaration_text(
      specifier.as_str(),
      "export default function bar(): void;",
    );
    let symbols = track_exports(&specifier, &module);
    assert!(matches!(
      &symbols[0],
      ExportedSymbol::Named { name, property_name, decl_id: Some(_), .. }
        if name == "default" && property_name == "bar"
    ));
  }
}
