// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::*;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitMut;
use deno_ast::swc::ecma_visit::VisitMutWith;
use deno_ast::swc::ecma_visit::VisitWith;
use indexmap::IndexMap;
use serde::Serialize;

use super::lexical_environment::LexicalEnvironment;
use crate::swc_helpers::decl_binding_idents;
use crate::swc_helpers::ident;
use crate::ModuleSpecifier;

/// Identifies a declaration by the file it was declared in and the start
/// of its name in that file.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct DeclId {
  pub specifier: ModuleSpecifier,
  pub start: u32,
}

impl DeclId {
  pub fn new(specifier: &ModuleSpecifier, start: u32) -> Self {
    Self {
      specifier: specifier.clone(),
      start,
    }
  }
}

/// The final name of every declaration placed in a chunk.
pub type DeconflictedBindings = IndexMap<DeclId, String>;

/// Gets the identifiers declared by a top level item, not including
/// import declarations.
pub fn module_item_declarations(item: &ModuleItem) -> Vec<Ident> {
  match item {
    ModuleItem::Stmt(Stmt::Decl(decl)) => decl_binding_idents(decl),
    ModuleItem::ModuleDecl(module_decl) => match module_decl {
      ModuleDecl::ExportDecl(export_decl) => {
        decl_binding_idents(&export_decl.decl)
      }
      ModuleDecl::ExportDefaultDecl(default_decl) => match &default_decl.decl {
        DefaultDecl::Class(class_expr) => {
          class_expr.ident.iter().cloned().collect()
        }
        DefaultDecl::Fn(fn_expr) => fn_expr.ident.iter().cloned().collect(),
        DefaultDecl::TsInterfaceDecl(interface_decl) => {
          vec![interface_decl.id.clone()]
        }
      },
      ModuleDecl::TsImportEquals(import_equals) => {
        vec![import_equals.id.clone()]
      }
      _ => Vec::new(),
    },
    ModuleItem::Stmt(_) => Vec::new(),
  }
}

/// Picks the name a declaration of `name` in `origin` is placed under.
pub fn deconflict_name(
  env: &LexicalEnvironment,
  name: &str,
  origin: &ModuleSpecifier,
) -> String {
  if env.is_identifier_free(name, origin) {
    name.to_string()
  } else {
    let unique = env.generate_unique_binding(name);
    log::debug!("Renaming {} in {} to {}", name, origin, unique);
    unique
  }
}

/// Binds every top level declaration of a file in the innermost frame of
/// the environment, renaming the ones whose name is owned by another file.
///
/// Repeated declarations of a name in one file (overloads, merged
/// interfaces and namespaces) share one binding.
pub fn deconflict_declarations(
  items: &[ModuleItem],
  origin: &ModuleSpecifier,
  env: &mut LexicalEnvironment,
  bindings: &mut DeconflictedBindings,
) {
  for item in items {
    for ident in module_item_declarations(item) {
      let name = ident.sym.as_str();
      let canonical = match env.lookup_own(origin, name) {
        Some(existing) => existing.to_string(),
        None => deconflict_name(env, name, origin),
      };
      env.add_binding(origin, &canonical, Some(name));
      bindings.insert(DeclId::new(origin, ident.span.lo.0), canonical);
    }
  }
}

/// Rewrites the identifiers of a file to their canonical names.
///
/// Type parameters, mapped type keys and names declared in namespace
/// bodies shadow the top level bindings. Parameter and property names are
/// never references.
pub struct Renamer<'a> {
  origin: &'a ModuleSpecifier,
  env: LexicalEnvironment,
  in_binding_name: bool,
}

impl<'a> Renamer<'a> {
  pub fn new(env: &LexicalEnvironment, origin: &'a ModuleSpecifier) -> Self {
    Self {
      origin,
      env: env.clone(),
      in_binding_name: false,
    }
  }

  fn enter_scope(
    &mut self,
    names: impl IntoIterator<Item = String>,
  ) -> LexicalEnvironment {
    let mut child = self.env.child();
    for name in names {
      child.add_alias(self.origin, &name, &name);
    }
    std::mem::replace(&mut self.env, child)
  }

  fn exit_scope(&mut self, parent: LexicalEnvironment) {
    self.env = parent;
  }

  fn rename(&self, ident: &mut Ident) -> bool {
    match self.env.lookup(self.origin, &ident.sym) {
      Some(canonical) if canonical != &*ident.sym => {
        ident.sym = canonical.into();
        true
      }
      _ => false,
    }
  }
}

fn type_param_names(type_params: Option<&TsTypeParamDecl>) -> Vec<String> {
  type_params
    .map(|decl| {
      decl
        .params
        .iter()
        .map(|param| param.name.sym.to_string())
        .collect()
    })
    .unwrap_or_default()
}

#[derive(Default)]
struct InferTypeCollector {
  names: Vec<String>,
}

impl Visit for InferTypeCollector {
  fn visit_ts_infer_type(&mut self, n: &TsInferType) {
    self.names.push(n.type_param.name.sym.to_string());
  }
}

impl VisitMut for Renamer<'_> {
  fn visit_mut_ident(&mut self, n: &mut Ident) {
    self.rename(n);
  }

  fn visit_mut_binding_ident(&mut self, n: &mut BindingIdent) {
    let rename_binding = std::mem::replace(&mut self.in_binding_name, false);
    if rename_binding {
      self.rename(&mut n.id);
    }
    n.type_ann.visit_mut_with(self);
    self.in_binding_name = rename_binding;
  }

  fn visit_mut_var_declarator(&mut self, n: &mut VarDeclarator) {
    self.in_binding_name = true;
    n.name.visit_mut_with(self);
    self.in_binding_name = false;
    n.init.visit_mut_with(self);
  }

  fn visit_mut_ts_property_signature(&mut self, n: &mut TsPropertySignature) {
    if n.computed {
      n.key.visit_mut_with(self);
    }
    n.type_ann.visit_mut_with(self);
  }

  fn visit_mut_ts_getter_signature(&mut self, n: &mut TsGetterSignature) {
    if n.computed {
      n.key.visit_mut_with(self);
    }
    n.type_ann.visit_mut_with(self);
  }

  fn visit_mut_ts_setter_signature(&mut self, n: &mut TsSetterSignature) {
    if n.computed {
      n.key.visit_mut_with(self);
    }
    n.param.visit_mut_with(self);
  }

  fn visit_mut_ts_method_signature(&mut self, n: &mut TsMethodSignature) {
    if n.computed {
      n.key.visit_mut_with(self);
    }
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.type_params.visit_mut_with(self);
    n.params.visit_mut_with(self);
    n.type_ann.visit_mut_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_type_predicate(&mut self, n: &mut TsTypePredicate) {
    // the asserted parameter is not a reference
    n.type_ann.visit_mut_with(self);
  }

  fn visit_mut_ts_enum_member(&mut self, n: &mut TsEnumMember) {
    n.init.visit_mut_with(self);
  }

  fn visit_mut_ts_type_param(&mut self, n: &mut TsTypeParam) {
    n.constraint.visit_mut_with(self);
    n.default.visit_mut_with(self);
  }

  fn visit_mut_ts_import_type(&mut self, n: &mut TsImportType) {
    // the qualifier names an export of the imported module
    n.type_args.visit_mut_with(self);
  }

  fn visit_mut_import_decl(&mut self, _n: &mut ImportDecl) {}

  fn visit_mut_export_all(&mut self, _n: &mut ExportAll) {}

  fn visit_mut_ts_namespace_export_decl(
    &mut self,
    _n: &mut TsNamespaceExportDecl,
  ) {
  }

  fn visit_mut_named_export(&mut self, n: &mut NamedExport) {
    if n.src.is_none() {
      n.visit_mut_children_with(self);
    }
  }

  fn visit_mut_export_named_specifier(&mut self, n: &mut ExportNamedSpecifier) {
    if let ModuleExportName::Ident(orig) = &mut n.orig {
      let original = orig.sym.to_string();
      if self.rename(orig) && n.exported.is_none() {
        n.exported = Some(ModuleExportName::Ident(ident(&original)));
      }
    }
  }

  fn visit_mut_function(&mut self, n: &mut Function) {
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_class(&mut self, n: &mut Class) {
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_interface_decl(&mut self, n: &mut TsInterfaceDecl) {
    self.rename(&mut n.id);
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.type_params.visit_mut_with(self);
    n.extends.visit_mut_with(self);
    n.body.visit_mut_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_type_alias_decl(&mut self, n: &mut TsTypeAliasDecl) {
    self.rename(&mut n.id);
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.type_params.visit_mut_with(self);
    n.type_ann.visit_mut_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_fn_type(&mut self, n: &mut TsFnType) {
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_constructor_type(&mut self, n: &mut TsConstructorType) {
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_call_signature_decl(
    &mut self,
    n: &mut TsCallSignatureDecl,
  ) {
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_construct_signature_decl(
    &mut self,
    n: &mut TsConstructSignatureDecl,
  ) {
    let parent = self.enter_scope(type_param_names(n.type_params.as_deref()));
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_mapped_type(&mut self, n: &mut TsMappedType) {
    let parent = self.enter_scope([n.type_param.name.sym.to_string()]);
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_conditional_type(&mut self, n: &mut TsConditionalType) {
    let mut collector = InferTypeCollector::default();
    n.extends_type.visit_with(&mut collector);
    let parent = self.enter_scope(collector.names);
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }

  fn visit_mut_ts_namespace_decl(&mut self, n: &mut TsNamespaceDecl) {
    n.body.visit_mut_with(self);
  }

  fn visit_mut_ts_module_block(&mut self, n: &mut TsModuleBlock) {
    let names = n
      .body
      .iter()
      .flat_map(module_item_declarations)
      .map(|ident| ident.sym.to_string())
      .collect::<Vec<_>>();
    let parent = self.enter_scope(names);
    n.visit_mut_children_with(self);
    self.exit_scope(parent);
  }
}
