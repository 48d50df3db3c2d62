// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::*;
use deno_ast::swc::codegen::text_writer::JsWriter;
use deno_ast::swc::codegen::Node;
use deno_ast::swc::common::sync::Lrc;
use deno_ast::swc::common::SourceMap;
use deno_ast::swc::common::DUMMY_SP;
use deno_ast::swc::utils::find_pat_ids;
use deno_ast::swc_codegen_config;

pub fn ident(name: &str) -> Ident {
  Ident::new_no_ctxt(name.into(), DUMMY_SP)
}

pub fn str_lit(text: &str) -> Str {
  Str {
    span: DUMMY_SP,
    value: text.into(),
    raw: None,
  }
}

pub fn str_value(value: &Str) -> String {
  value.value.to_string()
}

pub fn module_export_name_text(name: &ModuleExportName) -> String {
  match name {
    ModuleExportName::Ident(ident) => ident.sym.to_string(),
    ModuleExportName::Str(value) => str_value(value),
  }
}

/// Creates `local as exported`, omitting the alias when both are equal.
pub fn export_specifier(local: &str, exported: &str) -> ExportSpecifier {
  ExportSpecifier::Named(ExportNamedSpecifier {
    span: DUMMY_SP,
    orig: ModuleExportName::Ident(ident(local)),
    exported: if local == exported {
      None
    } else {
      Some(ModuleExportName::Ident(ident(exported)))
    },
    is_type_only: false,
  })
}

pub fn named_export(
  specifiers: Vec<ExportSpecifier>,
  src: Option<&str>,
) -> ModuleItem {
  ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(NamedExport {
    span: DUMMY_SP,
    specifiers,
    src: src.map(|src| Box::new(str_lit(src))),
    type_only: false,
    with: None,
  }))
}

pub fn export_all(src: &str) -> ModuleItem {
  ModuleItem::ModuleDecl(ModuleDecl::ExportAll(ExportAll {
    span: DUMMY_SP,
    src: Box::new(str_lit(src)),
    type_only: false,
    with: None,
  }))
}

pub fn import_decl(
  specifiers: Vec<ImportSpecifier>,
  src: &str,
  type_only: bool,
) -> ModuleItem {
  ModuleItem::ModuleDecl(ModuleDecl::Import(ImportDecl {
    span: DUMMY_SP,
    specifiers,
    src: Box::new(str_lit(src)),
    type_only,
    with: None,
    phase: Default::default(),
  }))
}

pub fn import_named_specifier(imported: &str, local: &str) -> ImportSpecifier {
  ImportSpecifier::Named(ImportNamedSpecifier {
    span: DUMMY_SP,
    local: ident(local),
    imported: if imported == local {
      None
    } else {
      Some(ModuleExportName::Ident(ident(imported)))
    },
    is_type_only: false,
  })
}

pub fn import_default_specifier(local: &str) -> ImportSpecifier {
  ImportSpecifier::Default(ImportDefaultSpecifier {
    span: DUMMY_SP,
    local: ident(local),
  })
}

pub fn import_star_as_specifier(local: &str) -> ImportSpecifier {
  ImportSpecifier::Namespace(ImportStarAsSpecifier {
    span: DUMMY_SP,
    local: ident(local),
  })
}

/// `declare namespace <name> { <body> }`
pub fn namespace_decl(name: &str, body: Vec<ModuleItem>) -> Decl {
  Decl::TsModule(Box::new(TsModuleDecl {
    span: DUMMY_SP,
    declare: true,
    global: false,
    namespace: true,
    id: TsModuleName::Ident(ident(name)),
    body: Some(TsNamespaceBody::TsModuleBlock(TsModuleBlock {
      span: DUMMY_SP,
      body,
    })),
  }))
}

/// `import <name> = <target>;`, optionally exported.
pub fn import_equals_alias(
  name: &str,
  target: &str,
  is_export: bool,
) -> ModuleItem {
  ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(Box::new(
    TsImportEqualsDecl {
      span: DUMMY_SP,
      is_export,
      is_type_only: false,
      id: ident(name),
      module_ref: TsModuleRef::TsEntityName(TsEntityName::Ident(ident(
        target,
      ))),
    },
  )))
}

pub fn type_ref(
  type_name: TsEntityName,
  type_args: Option<Box<TsTypeParamInstantiation>>,
) -> TsType {
  TsType::TsTypeRef(TsTypeRef {
    span: DUMMY_SP,
    type_name,
    type_params: type_args,
  })
}

/// Gets the leftmost identifier of an entity name (`A` in `A.B.C`).
pub fn leftmost_ident_mut(entity_name: &mut TsEntityName) -> &mut Ident {
  match entity_name {
    TsEntityName::Ident(ident) => ident,
    TsEntityName::TsQualifiedName(qualified_name) => {
      leftmost_ident_mut(&mut qualified_name.left)
    }
  }
}

pub fn leftmost_ident(entity_name: &TsEntityName) -> &Ident {
  match entity_name {
    TsEntityName::Ident(ident) => ident,
    TsEntityName::TsQualifiedName(qualified_name) => {
      leftmost_ident(&qualified_name.left)
    }
  }
}

/// Prints a declaration module.
pub fn emit_module(module: &Module) -> Result<String, anyhow::Error> {
  let source_map = Lrc::new(SourceMap::default());
  let mut buf = vec![];
  {
    let mut writer =
      Box::new(JsWriter::new(source_map.clone(), "\n", &mut buf, None));
    writer.set_indent_str("  "); // two spaces

    let mut emitter = deno_ast::swc::codegen::Emitter {
      cfg: swc_codegen_config(),
      comments: None,
      cm: source_map.clone(),
      wr: writer,
    };
    module.emit_with(&mut emitter)?;
  }
  Ok(String::from_utf8(buf)?)
}

/// Gets the identifiers a declaration binds at the level it is declared.
///
/// `declare global` and string named ambient modules bind nothing.
pub fn decl_binding_idents(decl: &Decl) -> Vec<Ident> {
  match decl {
    Decl::Class(class_decl) => vec![class_decl.ident.clone()],
    Decl::Fn(fn_decl) => vec![fn_decl.ident.clone()],
    Decl::Var(var_decl) => var_decl
      .decls
      .iter()
      .flat_map(|decl| find_pat_ids::<_, Ident>(&decl.name))
      .collect(),
    Decl::Using(using_decl) => using_decl
      .decls
      .iter()
      .flat_map(|decl| find_pat_ids::<_, Ident>(&decl.name))
      .collect(),
    Decl::TsInterface(interface_decl) => vec![interface_decl.id.clone()],
    Decl::TsTypeAlias(type_alias_decl) => vec![type_alias_decl.id.clone()],
    Decl::TsEnum(enum_decl) => vec![enum_decl.id.clone()],
    Decl::TsModule(module_decl) => match &module_decl.id {
      TsModuleName::Ident(ident) if !module_decl.global => vec![ident.clone()],
      _ => Vec::new(),
    },
  }
}
