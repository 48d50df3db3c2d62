// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashMap;
use std::collections::HashSet;
use std::rc::Rc;

use deno_ast::swc::ast::*;
use deno_ast::swc::common::Spanned;
use deno_ast::swc::common::DUMMY_SP;
use deno_ast::swc::ecma_visit::Visit;
use deno_ast::swc::ecma_visit::VisitMut;
use deno_ast::swc::ecma_visit::VisitMutWith;
use deno_ast::swc::ecma_visit::VisitWith;
use indexmap::IndexMap;
use indexmap::IndexSet;

use super::declare_modifier::ensure_no_declare;
use super::declare_modifier::ensure_no_declare_module_item;
use super::declare_modifier::map_owned_module_item;
use super::deconflict::deconflict_declarations;
use super::deconflict::DeconflictedBindings;
use super::deconflict::Renamer;
use super::export_promotion::is_anonymous_default;
use super::export_promotion::promote_to_export_declaration;
use super::lexical_environment::unique_name;
use super::lexical_environment::LexicalEnvironment;
use super::placement::Placed;
use super::placement::VisitResult;
use super::track_exports::track_exports;
use super::track_exports::ExportedSymbol;
use super::DeclarationTransformer;
use super::IncludedSourceFiles;
use crate::chunk::ChunkId;
use crate::chunk::ChunkMembership;
use crate::chunk::NormalizedChunk;
use crate::collections::IncludedSet;
use crate::module_specifier::is_relative_specifier;
use crate::module_specifier::relative_module_specifier;
use crate::module_specifier::specifier_stem;
use crate::source::DeclarationFiles;
use crate::source::Resolver;
use crate::swc_helpers::decl_binding_idents;
use crate::swc_helpers::export_all;
use crate::swc_helpers::export_specifier;
use crate::swc_helpers::ident;
use crate::swc_helpers::import_decl;
use crate::swc_helpers::import_equals_alias;
use crate::swc_helpers::import_default_specifier;
use crate::swc_helpers::import_named_specifier;
use crate::swc_helpers::import_star_as_specifier;
use crate::swc_helpers::leftmost_ident;
use crate::swc_helpers::leftmost_ident_mut;
use crate::swc_helpers::module_export_name_text;
use crate::swc_helpers::named_export;
use crate::swc_helpers::namespace_decl;
use crate::swc_helpers::str_lit;
use crate::swc_helpers::str_value;
use crate::swc_helpers::type_ref;
use crate::ModuleSpecifier;

#[derive(Clone, Copy)]
pub struct MergeChunkOptions<'a> {
  pub chunk: &'a NormalizedChunk,
  pub files: &'a DeclarationFiles,
  pub resolver: &'a dyn Resolver,
  pub membership: &'a ChunkMembership<'a>,
  pub transformers: &'a [&'a dyn DeclarationTransformer],
}

/// The declaration module produced for one chunk.
#[derive(Debug, Clone)]
pub struct MergedChunk {
  pub chunk_id: ChunkId,
  pub file_name: String,
  pub specifier: ModuleSpecifier,
  pub module: Module,
  /// Final name of every top level declaration inlined into the chunk.
  pub bindings: DeconflictedBindings,
}

/// Merges the declaration files of a chunk into a single module, starting
/// from each of the chunk's entry modules.
pub fn merge_chunk(
  options: MergeChunkOptions,
  included: &mut IncludedSourceFiles,
) -> MergedChunk {
  let mut merger = ChunkMerger::new(options, included);
  for module in &options.chunk.entry_modules {
    match options.files.find_for_module(module) {
      Some(specifier) => merger.include_file(specifier, FileRole::Entry),
      None => log::debug!(
        "No declaration file for {} in chunk {}",
        module,
        options.chunk.file_name
      ),
    }
  }
  merger.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileRole {
  /// The file's export surface becomes the chunk's export surface.
  Entry,
  /// Inlined because another file imports from it. Its exports are only
  /// resolved on demand.
  Dependency,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ImportedName {
  Named(String),
  Default,
  Namespace,
}

impl ImportedName {
  fn from_export_name(name: &str) -> Self {
    if name == "default" {
      ImportedName::Default
    } else {
      ImportedName::Named(name.to_string())
    }
  }
}

/// A statement list being built: the chunk itself or a synthesized
/// namespace block.
#[derive(Default)]
struct MergeScope {
  env: LexicalEnvironment,
  items: Vec<ModuleItem>,
  /// The file a namespace block holds. Its other dependencies are inlined
  /// at the root, and the root scope uses the set shared by every chunk.
  included: IncludedSet<ModuleSpecifier>,
  namespaces: HashMap<ModuleSpecifier, String>,
}

#[derive(Default)]
struct CollectedExports {
  /// (exported name, canonical binding)
  names: Vec<(String, String)>,
  /// Module specifiers of `export *` targets outside the chunk.
  external_stars: Vec<String>,
}

enum ImportTypeTarget {
  Binding(String),
  Specifier(String),
}

type ImportTypeKey = (String, Option<String>);

/// An import that stays in the chunk's output.
struct PreservedImport {
  /// The first local is the one every file refers to. Later ones alias it
  /// under another name.
  locals: Vec<String>,
  /// Whether every import of the symbol was type only.
  type_only: bool,
}

struct ChunkMerger<'a, 'b> {
  options: MergeChunkOptions<'a>,
  included: &'b mut IncludedSourceFiles,
  root: MergeScope,
  nested: Vec<MergeScope>,
  /// Namespace scopes set aside while a dependency is inlined at the root.
  suspended: Vec<MergeScope>,
  bindings: DeconflictedBindings,
  export_tables: HashMap<ModuleSpecifier, Rc<Vec<ExportedSymbol>>>,
  /// (module specifier, imported name) -> locals
  preserved_imports: IndexMap<(String, ImportedName), PreservedImport>,
  side_effect_imports: IndexSet<String>,
}

impl<'a, 'b> ChunkMerger<'a, 'b> {
  fn new(
    options: MergeChunkOptions<'a>,
    included: &'b mut IncludedSourceFiles,
  ) -> Self {
    Self {
      options,
      included,
      root: MergeScope::default(),
      nested: Vec::new(),
      suspended: Vec::new(),
      bindings: Default::default(),
      export_tables: Default::default(),
      preserved_imports: Default::default(),
      side_effect_imports: Default::default(),
    }
  }

  fn in_namespace(&self) -> bool {
    !self.nested.is_empty()
  }

  fn scope(&self) -> &MergeScope {
    match self.nested.last() {
      Some(scope) => scope,
      None => &self.root,
    }
  }

  fn scope_mut(&mut self) -> &mut MergeScope {
    match self.nested.last_mut() {
      Some(scope) => scope,
      None => &mut self.root,
    }
  }

  fn all_scopes(&self) -> impl Iterator<Item = &MergeScope> {
    std::iter::once(&self.root)
      .chain(self.suspended.iter())
      .chain(self.nested.iter())
  }

  /// Picks a name for a synthesized binding that no scope uses and claims
  /// it for the chunk in every scope.
  fn claim_unique_name(&mut self, desired: &str) -> String {
    let name = unique_name(desired, |name| {
      self.all_scopes().any(|scope| scope.env.is_taken(name))
    });
    let scopes = std::iter::once(&mut self.root)
      .chain(self.suspended.iter_mut())
      .chain(self.nested.iter_mut());
    for scope in scopes {
      scope.env.claim(&name);
    }
    name
  }

  fn include_file(&mut self, specifier: &ModuleSpecifier, role: FileRole) {
    if self.in_namespace() {
      let in_namespace = self
        .nested
        .iter()
        .any(|scope| scope.included.has_seen(specifier));
      if !in_namespace {
        self.include_in_root(specifier, role);
      }
      return;
    }
    if !self.included.add(specifier.clone()) {
      if role == FileRole::Entry {
        self.regenerate_exports(specifier);
      }
      return;
    }
    self.inline_file(specifier, role);
  }

  /// Inlines a dependency of a namespace block at the root of the chunk,
  /// then makes the bindings of every file inlined along the way visible
  /// in the namespace scopes.
  fn include_in_root(&mut self, specifier: &ModuleSpecifier, role: FileRole) {
    let start = self.included.len();
    let depth = self.suspended.len();
    let nested = std::mem::take(&mut self.nested);
    self.suspended.extend(nested);
    self.include_file(specifier, role);
    self.nested = self.suspended.split_off(depth);

    let added = self
      .included
      .added_since(start)
      .cloned()
      .collect::<Vec<_>>();
    if added.is_empty() {
      return;
    }
    let root_env = &self.root.env;
    for scope in &mut self.nested {
      scope.env.inherit(root_env, &added);
    }
  }

  fn inline_file(&mut self, specifier: &ModuleSpecifier, role: FileRole) {
    let Some(module) = self.options.files.get(specifier) else {
      log::warn!("Missing declaration file {}", specifier);
      return;
    };
    log::debug!("Inlining {} ({:?})", specifier, role);
    let module = self
      .options
      .transformers
      .iter()
      .fold(module.clone(), |module, transformer| {
        transformer.transform(specifier, module)
      });
    let items = self.merge_file(specifier, module.body, role);
    self.scope_mut().items.extend(items);
  }

  fn merge_file(
    &mut self,
    origin: &ModuleSpecifier,
    body: Vec<ModuleItem>,
    role: FileRole,
  ) -> Vec<ModuleItem> {
    let mut items = Vec::with_capacity(body.len());
    for item in body {
      if is_anonymous_default(&item) {
        promote_to_export_declaration(&item, origin).splice(item, &mut items);
      } else {
        items.push(item);
      }
    }

    // imports are handled after the file's own declarations are bound so
    // that cyclic imports can see them
    let mut imports = Vec::new();
    let mut rest = Vec::with_capacity(items.len());
    for item in items {
      match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
          imports.push(import);
        }
        ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(import_equals))
          if self.in_chunk_require(&import_equals, origin).is_some() =>
        {
          imports.push(require_as_import(&import_equals));
          if import_equals.is_export {
            rest.push(named_export(
              vec![export_specifier(
                &import_equals.id.sym,
                &import_equals.id.sym,
              )],
              None,
            ));
          }
        }
        item => rest.push(item),
      }
    }

    let mut file_bindings = DeconflictedBindings::default();
    deconflict_declarations(
      &rest,
      origin,
      &mut self.scope_mut().env,
      &mut file_bindings,
    );
    for (decl_id, name) in file_bindings {
      self.bindings.entry(decl_id).or_insert(name);
    }

    for import in &imports {
      self.merge_import(origin, import);
    }
    for item in &rest {
      if let Some(src) = reexport_src(item) {
        if let Some(target) = self.resolve_in_chunk(&src, origin) {
          self.include_file(&target, FileRole::Dependency);
        }
      }
    }

    // the merged nodes still use the file's names while the prepended and
    // appended ones are synthesized with canonical names
    let mut output = Vec::with_capacity(rest.len());
    for item in rest {
      let placed = self.merge_item(origin, &item, role);
      output.extend(placed.prepend);
      let mut nodes = placed.result.into_nodes(item);
      let renamer_env = self.scope().env.clone();
      let mut renamer = Renamer::new(&renamer_env, origin);
      for node in &mut nodes {
        node.visit_mut_with(&mut renamer);
      }
      self.rewrite_import_types(origin, &mut nodes);
      output.extend(nodes);
      output.extend(placed.append);
    }
    output
  }

  /// Merges one item of a file. Declarations synthesized in the current
  /// scope while doing so, such as namespace blocks, are placed before it.
  fn merge_item(
    &mut self,
    origin: &ModuleSpecifier,
    item: &ModuleItem,
    role: FileRole,
  ) -> Placed<ModuleItem> {
    let start = self.scope().items.len();
    let placed = self.merge_module_item(origin, item, role);
    let synthesized = self.scope_mut().items.split_off(start);
    placed.with_prepend(synthesized)
  }

  fn merge_module_item(
    &mut self,
    origin: &ModuleSpecifier,
    item: &ModuleItem,
    role: FileRole,
  ) -> Placed<ModuleItem> {
    let keep_exports = role == FileRole::Entry && !self.in_namespace();
    let ModuleItem::ModuleDecl(module_decl) = item else {
      return self.strip_declare(item, Placed::unchanged());
    };
    match module_decl {
      ModuleDecl::ExportDecl(export_decl) => {
        let idents = decl_binding_idents(&export_decl.decl);
        if keep_exports && !self.is_renamed(origin, &idents) {
          return Placed::unchanged();
        }
        self.promote(origin, item, keep_exports)
      }
      ModuleDecl::ExportDefaultDecl(default_decl) => {
        let idents = match &default_decl.decl {
          DefaultDecl::Class(class_expr) => {
            class_expr.ident.iter().cloned().collect()
          }
          DefaultDecl::Fn(fn_expr) => fn_expr.ident.iter().cloned().collect(),
          DefaultDecl::TsInterfaceDecl(interface_decl) => {
            vec![interface_decl.id.clone()]
          }
        };
        if keep_exports && !self.is_renamed(origin, &idents) {
          return Placed::unchanged();
        }
        self.promote(origin, item, keep_exports)
      }
      ModuleDecl::ExportNamed(named) if named.src.is_some() => {
        Placed::new(VisitResult::Removed)
          .with_append(self.merge_reexport(origin, named, keep_exports))
      }
      ModuleDecl::ExportAll(export_all) => Placed::new(VisitResult::Removed)
        .with_append(self.merge_export_all(origin, export_all, keep_exports)),
      ModuleDecl::TsImportEquals(import_equals) => {
        let mut import_equals = import_equals.clone();
        if let TsModuleRef::TsExternalModuleRef(module_ref) =
          &mut import_equals.module_ref
        {
          let text = str_value(&module_ref.expr);
          let rewritten = self.rewrite_module_specifier(&text, origin);
          module_ref.expr = str_lit(&rewritten);
        }
        let rewritten =
          ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(import_equals));
        if keep_exports {
          Placed::new(VisitResult::Replaced(rewritten))
        } else {
          self.promote(origin, &rewritten, false)
        }
      }
      ModuleDecl::ExportNamed(_)
      | ModuleDecl::ExportDefaultExpr(_)
      | ModuleDecl::TsExportAssignment(_)
      | ModuleDecl::TsNamespaceExport(_) => {
        if keep_exports {
          Placed::unchanged()
        } else {
          Placed::new(VisitResult::Removed)
        }
      }
      // handled before the items are merged
      ModuleDecl::Import(_) => Placed::new(VisitResult::Removed),
    }
  }

  /// Splits an exported declaration into the declaration and an export
  /// statement, dropping the export statement when the file's exports are
  /// not kept.
  fn promote(
    &self,
    origin: &ModuleSpecifier,
    item: &ModuleItem,
    keep_exports: bool,
  ) -> Placed<ModuleItem> {
    let mut items = Vec::new();
    let placed = promote_to_export_declaration(item, origin);
    placed.splice(item.clone(), &mut items);
    if !keep_exports {
      items.retain(|item| {
        !matches!(item, ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(_)))
      });
    }
    self.strip_declare(item, Placed::new(VisitResult::Multiple(items)))
  }

  /// Removes `declare` modifiers from the merged nodes inside namespace
  /// blocks.
  fn strip_declare(
    &self,
    original: &ModuleItem,
    mut placed: Placed<ModuleItem>,
  ) -> Placed<ModuleItem> {
    if self.in_namespace() {
      placed.result = placed.result.map_nodes(original, |item| {
        map_owned_module_item(item, ensure_no_declare_module_item)
      });
    }
    placed
  }

  fn is_renamed(&self, origin: &ModuleSpecifier, idents: &[Ident]) -> bool {
    idents.iter().any(|ident| {
      self
        .scope()
        .env
        .lookup(origin, &ident.sym)
        .is_some_and(|canonical| canonical != &*ident.sym)
    })
  }

  fn merge_import(&mut self, origin: &ModuleSpecifier, import: &ImportDecl) {
    let src = str_value(&import.src);
    let Some(target) = self.resolve_in_chunk(&src, origin) else {
      let module = self.rewrite_module_specifier(&src, origin);
      if import.specifiers.is_empty() {
        self.side_effect_imports.insert(module);
        return;
      }
      for specifier in &import.specifiers {
        let (local, imported, type_only) = match specifier {
          ImportSpecifier::Named(named) => {
            let imported = named
              .imported
              .as_ref()
              .map(module_export_name_text)
              .unwrap_or_else(|| named.local.sym.to_string());
            (
              &named.local,
              ImportedName::from_export_name(&imported),
              named.is_type_only,
            )
          }
          ImportSpecifier::Default(default) => {
            (&default.local, ImportedName::Default, false)
          }
          ImportSpecifier::Namespace(namespace) => {
            (&namespace.local, ImportedName::Namespace, false)
          }
        };
        let canonical = self.preserve_import(
          &module,
          imported,
          &local.sym,
          import.type_only || type_only,
        );
        self.scope_mut().env.add_alias(origin, &local.sym, &canonical);
      }
      return;
    };

    self.include_file(&target, FileRole::Dependency);
    for specifier in &import.specifiers {
      let (local, canonical) = match specifier {
        ImportSpecifier::Named(named) => {
          let imported = named
            .imported
            .as_ref()
            .map(module_export_name_text)
            .unwrap_or_else(|| named.local.sym.to_string());
          let canonical =
            self.resolve_export(&target, &imported, &mut HashSet::new());
          (&named.local, canonical)
        }
        ImportSpecifier::Default(default) => {
          let canonical =
            self.resolve_export(&target, "default", &mut HashSet::new());
          (&default.local, canonical)
        }
        ImportSpecifier::Namespace(namespace) => {
          let canonical =
            self.ensure_namespace_block(&target, &namespace.local.sym);
          (&namespace.local, Some(canonical))
        }
      };
      match canonical {
        Some(canonical) => {
          self.scope_mut().env.add_alias(origin, &local.sym, &canonical)
        }
        None => log::warn!(
          "{} does not export the binding imported as '{}' in {}",
          target,
          local.sym,
          origin
        ),
      }
    }
  }

  fn merge_reexport(
    &mut self,
    origin: &ModuleSpecifier,
    named: &NamedExport,
    keep_exports: bool,
  ) -> Vec<ModuleItem> {
    if !keep_exports {
      return Vec::new();
    }
    let Some(src) = named.src.as_deref().map(str_value) else {
      return Vec::new();
    };
    let Some(target) = self.resolve_in_chunk(&src, origin) else {
      let mut named = named.clone();
      named.src =
        Some(Box::new(str_lit(&self.rewrite_module_specifier(&src, origin))));
      return vec![ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named))];
    };

    let mut specifiers = Vec::with_capacity(named.specifiers.len());
    for specifier in &named.specifiers {
      let (exported, canonical) = match specifier {
        ExportSpecifier::Named(named) => {
          let orig = module_export_name_text(&named.orig);
          let exported = named
            .exported
            .as_ref()
            .map(module_export_name_text)
            .unwrap_or_else(|| orig.clone());
          let canonical =
            self.resolve_export(&target, &orig, &mut HashSet::new());
          (exported, canonical)
        }
        ExportSpecifier::Default(_) => {
          unreachable!("export default from is stage 1")
        }
        ExportSpecifier::Namespace(namespace) => {
          let exported = module_export_name_text(&namespace.name);
          let canonical = self.ensure_namespace_block(&target, &exported);
          (exported, Some(canonical))
        }
      };
      match canonical {
        Some(canonical) => {
          specifiers.push(export_specifier(&canonical, &exported))
        }
        None => log::warn!(
          "{} does not export '{}' re-exported by {}",
          target,
          exported,
          origin
        ),
      }
    }
    if specifiers.is_empty() {
      Vec::new()
    } else {
      vec![named_export(specifiers, None)]
    }
  }

  fn merge_export_all(
    &mut self,
    origin: &ModuleSpecifier,
    export: &ExportAll,
    keep_exports: bool,
  ) -> Vec<ModuleItem> {
    if !keep_exports {
      return Vec::new();
    }
    let src = str_value(&export.src);
    let Some(target) = self.resolve_in_chunk(&src, origin) else {
      return vec![export_all(&self.rewrite_module_specifier(&src, origin))];
    };
    let collected = self.collect_exports(&target, false);
    let mut items = Vec::new();
    if !collected.names.is_empty() {
      items.push(named_export(
        collected
          .names
          .iter()
          .map(|(exported, canonical)| export_specifier(canonical, exported))
          .collect(),
        None,
      ));
    }
    items.extend(
      collected
        .external_stars
        .iter()
        .map(|specifier| export_all(specifier)),
    );
    items
  }

  /// Re-exports the export surface of an entry file that was already
  /// inlined as a dependency.
  fn regenerate_exports(&mut self, specifier: &ModuleSpecifier) {
    log::debug!("Regenerating the exports of {}", specifier);
    let collected = self.collect_exports(specifier, true);
    let mut items = Vec::new();
    if !collected.names.is_empty() {
      items.push(named_export(
        collected
          .names
          .iter()
          .map(|(exported, canonical)| export_specifier(canonical, exported))
          .collect(),
        None,
      ));
    }
    items.extend(
      collected
        .external_stars
        .iter()
        .map(|specifier| export_all(specifier)),
    );
    self.scope_mut().items.extend(items);
  }

  fn export_table(
    &mut self,
    specifier: &ModuleSpecifier,
  ) -> Rc<Vec<ExportedSymbol>> {
    if let Some(table) = self.export_tables.get(specifier) {
      return table.clone();
    }
    let table = Rc::new(
      self
        .options
        .files
        .get(specifier)
        .map(|module| track_exports(specifier, module))
        .unwrap_or_default(),
    );
    self.export_tables.insert(specifier.clone(), table.clone());
    table
  }

  /// Gets the canonical binding that `name` exported by `target` refers
  /// to, inlining files and preserving imports as necessary.
  fn resolve_export(
    &mut self,
    target: &ModuleSpecifier,
    name: &str,
    visited: &mut HashSet<(ModuleSpecifier, String)>,
  ) -> Option<String> {
    if !visited.insert((target.clone(), name.to_string())) {
      return None;
    }
    let table = self.export_table(target);
    for symbol in table.iter() {
      match symbol {
        ExportedSymbol::Named {
          name: exported_name,
          property_name,
          module_specifier,
          ..
        } if exported_name == name => {
          return match module_specifier {
            None => self
              .scope()
              .env
              .lookup(target, property_name)
              .map(|canonical| canonical.to_string()),
            Some(module_specifier) => self.resolve_reexport(
              target,
              module_specifier,
              property_name,
              name,
              visited,
            ),
          };
        }
        ExportedSymbol::NamespaceAs {
          name: exported_name,
          module_specifier,
        } if exported_name == name => {
          return Some(match self.resolve_in_chunk(module_specifier, target) {
            Some(file) => self.ensure_namespace_block(&file, name),
            None => {
              let module =
                self.rewrite_module_specifier(module_specifier, target);
              self.preserve_import(
                &module,
                ImportedName::Namespace,
                name,
                false,
              )
            }
          });
        }
        _ => {}
      }
    }

    // `export *` never re-exports a default export
    if name == "default" {
      return None;
    }
    let mut fallback = None;
    for symbol in table.iter() {
      let ExportedSymbol::Namespace { module_specifier } = symbol else {
        continue;
      };
      match self.resolve_in_chunk(module_specifier, target) {
        Some(file) => {
          self.include_file(&file, FileRole::Dependency);
          if let Some(found) = self.resolve_export(&file, name, visited) {
            return Some(found);
          }
        }
        None => {
          if fallback.is_none() {
            fallback =
              Some(self.rewrite_module_specifier(module_specifier, target));
          }
        }
      }
    }
    fallback.map(|module| {
      self.preserve_import(
        &module,
        ImportedName::Named(name.to_string()),
        name,
        false,
      )
    })
  }

  fn resolve_reexport(
    &mut self,
    target: &ModuleSpecifier,
    module_specifier: &str,
    property_name: &str,
    name: &str,
    visited: &mut HashSet<(ModuleSpecifier, String)>,
  ) -> Option<String> {
    match self.resolve_in_chunk(module_specifier, target) {
      Some(file) => {
        self.include_file(&file, FileRole::Dependency);
        self.resolve_export(&file, property_name, visited)
      }
      None => {
        let module = self.rewrite_module_specifier(module_specifier, target);
        Some(self.preserve_import(
          &module,
          ImportedName::from_export_name(property_name),
          name,
          false,
        ))
      }
    }
  }

  /// Collects every name exported by `target`, following `export *`
  /// declarations. The first export of a name wins.
  fn collect_exports(
    &mut self,
    target: &ModuleSpecifier,
    include_default: bool,
  ) -> CollectedExports {
    let mut collected = CollectedExports::default();
    let mut visited = HashSet::new();
    let mut seen_names = HashSet::new();
    self.collect_exports_into(
      target,
      include_default,
      &mut visited,
      &mut seen_names,
      &mut collected,
    );
    collected
  }

  fn collect_exports_into(
    &mut self,
    target: &ModuleSpecifier,
    include_default: bool,
    visited: &mut HashSet<ModuleSpecifier>,
    seen_names: &mut HashSet<String>,
    collected: &mut CollectedExports,
  ) {
    if !visited.insert(target.clone()) {
      return;
    }
    let table = self.export_table(target);
    for symbol in table.iter() {
      let Some(name) = symbol.exported_name() else {
        continue;
      };
      if name == "default" && !include_default {
        continue;
      }
      if !seen_names.insert(name.to_string()) {
        continue;
      }
      match self.resolve_export(target, name, &mut HashSet::new()) {
        Some(canonical) => {
          collected.names.push((name.to_string(), canonical));
        }
        None => {
          log::warn!("Could not resolve '{}' exported by {}", name, target)
        }
      }
    }
    for symbol in table.iter() {
      let ExportedSymbol::Namespace { module_specifier } = symbol else {
        continue;
      };
      match self.resolve_in_chunk(module_specifier, target) {
        Some(file) => {
          self.include_file(&file, FileRole::Dependency);
          self.collect_exports_into(
            &file,
            false,
            visited,
            seen_names,
            collected,
          );
        }
        None => {
          let module = self.rewrite_module_specifier(module_specifier, target);
          if !collected.external_stars.contains(&module) {
            collected.external_stars.push(module);
          }
        }
      }
    }
  }

  /// Gets the name of the namespace block holding the declarations of
  /// `target`, synthesizing the block in the current scope the first time.
  fn ensure_namespace_block(
    &mut self,
    target: &ModuleSpecifier,
    desired: &str,
  ) -> String {
    let existing = std::iter::once(&self.root)
      .chain(self.nested.iter())
      .filter_map(|scope| scope.namespaces.get(target))
      .last()
      .cloned();
    if let Some(name) = existing {
      return name;
    }

    let name = self.claim_unique_name(desired);
    self
      .scope_mut()
      .namespaces
      .insert(target.clone(), name.clone());
    log::debug!("Synthesizing namespace {} for {}", name, target);

    let mut scope = MergeScope {
      env: self.scope().env.child(),
      ..Default::default()
    };
    scope.included.add(target.clone());
    self.nested.push(scope);
    self.inline_file(target, FileRole::Dependency);
    let table = self.export_table(target);
    if table
      .iter()
      .any(|symbol| symbol.exported_name() == Some("default"))
    {
      log::warn!(
        "The default export of {} is not available on namespace {}",
        target,
        name
      );
    }
    let collected = self.collect_exports(target, false);
    for module in &collected.external_stars {
      log::warn!(
        "Namespace {} can not re-export everything from '{}'",
        name,
        module
      );
    }
    let Some(scope) = self.nested.pop() else {
      return name;
    };

    // a member bound outside of the block can not be exported under its
    // own name from inside it
    let declared = scope
      .items
      .iter()
      .flat_map(namespace_member_names)
      .collect::<HashSet<_>>();
    let mut exports = Vec::with_capacity(collected.names.len());
    for (exported, canonical) in collected.names {
      if exported == canonical && !declared.contains(&canonical) {
        let alias = self.alias_outer_binding(&canonical);
        exports.push((exported, alias));
      } else {
        exports.push((exported, canonical));
      }
    }

    let body = export_namespace_members(scope.items, &exports);
    let decl = namespace_decl(&name, body);
    let decl = if self.in_namespace() {
      ensure_no_declare(&decl).into_owned()
    } else {
      decl
    };
    self
      .scope_mut()
      .items
      .push(ModuleItem::Stmt(Stmt::Decl(decl)));
    name
  }

  /// Binds another name to a binding of the current scope. Preserved
  /// imports get another import specifier, other bindings an
  /// `import alias = binding` declaration.
  fn alias_outer_binding(&mut self, canonical: &str) -> String {
    let alias = self.claim_unique_name(canonical);
    let preserved = self
      .preserved_imports
      .values_mut()
      .find(|preserved| preserved.locals.iter().any(|l| l == canonical));
    match preserved {
      Some(preserved) => preserved.locals.push(alias.clone()),
      None => self
        .scope_mut()
        .items
        .push(import_equals_alias(&alias, canonical, false)),
    }
    log::debug!("Aliasing {} as {}", canonical, alias);
    alias
  }

  /// Claims a top level name for an import that stays in the chunk,
  /// reusing the local of an earlier import of the same symbol.
  fn preserve_import(
    &mut self,
    module: &str,
    imported: ImportedName,
    desired: &str,
    type_only: bool,
  ) -> String {
    let key = (module.to_string(), imported);
    if let Some(preserved) = self.preserved_imports.get_mut(&key) {
      log::debug!("Reusing import of {:?} from '{}'", key.1, module);
      preserved.type_only &= type_only;
      return preserved.locals[0].clone();
    }
    let local = self.claim_unique_name(desired);
    self.preserved_imports.insert(
      key,
      PreservedImport {
        locals: vec![local.clone()],
        type_only,
      },
    );
    local
  }

  /// Resolves a module specifier to a declaration file of the current
  /// chunk.
  fn resolve_in_chunk(
    &self,
    specifier: &str,
    referrer: &ModuleSpecifier,
  ) -> Option<ModuleSpecifier> {
    let resolved = self.options.resolver.resolve(specifier, referrer)?;
    let chunk_id = self.options.membership.chunk_for(&resolved)?;
    if chunk_id != self.options.chunk.id {
      return None;
    }
    self.options.files.find_for_module(&resolved).cloned()
  }

  fn in_chunk_require(
    &self,
    import_equals: &TsImportEqualsDecl,
    origin: &ModuleSpecifier,
  ) -> Option<ModuleSpecifier> {
    match &import_equals.module_ref {
      TsModuleRef::TsExternalModuleRef(module_ref) => {
        self.resolve_in_chunk(&str_value(&module_ref.expr), origin)
      }
      TsModuleRef::TsEntityName(_) => None,
    }
  }

  /// Rewrites a module specifier that stays in the output so that it is
  /// relative to the chunk's declaration file.
  fn rewrite_module_specifier(
    &self,
    specifier: &str,
    referrer: &ModuleSpecifier,
  ) -> String {
    let Some(resolved) = self.options.resolver.resolve(specifier, referrer)
    else {
      return specifier.to_string();
    };
    let chunk = self.options.chunk;
    if let Some(other) = self
      .options
      .membership
      .chunk_for(&resolved)
      .filter(|id| *id != chunk.id)
      .and_then(|id| self.options.membership.get(id))
    {
      return relative_module_specifier(&chunk.specifier, &other.specifier)
        .unwrap_or_else(|| other.specifier.to_string());
    }
    let is_path =
      is_relative_specifier(specifier) || specifier.starts_with('/');
    if resolved.scheme() == "file" && is_path {
      relative_module_specifier(&chunk.specifier, &resolved)
        .unwrap_or_else(|| specifier.to_string())
    } else {
      specifier.to_string()
    }
  }

  /// Replaces `import("./x").Y` types pointing into the chunk with
  /// references to the inlined declarations.
  fn rewrite_import_types(
    &mut self,
    origin: &ModuleSpecifier,
    items: &mut [ModuleItem],
  ) {
    let mut collector = ImportTypeCollector::default();
    for item in items.iter() {
      item.visit_with(&mut collector);
    }
    if collector.keys.is_empty() {
      return;
    }
    let mut targets = HashMap::new();
    for key in collector.keys {
      let (arg, head) = &key;
      let target = match self.resolve_in_chunk(arg, origin) {
        Some(file) => {
          self.include_file(&file, FileRole::Dependency);
          match head {
            Some(head) => self
              .resolve_export(&file, head, &mut HashSet::new())
              .map(ImportTypeTarget::Binding),
            None => {
              let desired = namespace_name_for_file(&file);
              Some(ImportTypeTarget::Binding(
                self.ensure_namespace_block(&file, &desired),
              ))
            }
          }
        }
        None => Some(ImportTypeTarget::Specifier(
          self.rewrite_module_specifier(arg, origin),
        )),
      };
      if let Some(target) = target {
        targets.insert(key, target);
      }
    }
    let mut rewriter = ImportTypeRewriter { targets: &targets };
    for item in items.iter_mut() {
      item.visit_mut_with(&mut rewriter);
    }
  }

  fn hoisted_imports(&self) -> Vec<ModuleItem> {
    #[derive(Default)]
    struct ModuleImports<'a> {
      default: Option<&'a str>,
      named: Vec<ImportSpecifier>,
      namespaces: Vec<(&'a str, bool)>,
      type_only: Option<bool>,
    }

    let mut modules: IndexMap<&str, ModuleImports> = IndexMap::new();
    for ((module, imported), preserved) in &self.preserved_imports {
      let imports = modules.entry(module.as_str()).or_default();
      for local in &preserved.locals {
        match imported {
          ImportedName::Default if imports.default.is_none() => {
            imports.default = Some(local.as_str());
          }
          ImportedName::Default => {
            imports.named.push(import_named_specifier("default", local))
          }
          ImportedName::Named(name) => {
            imports.named.push(import_named_specifier(name, local))
          }
          ImportedName::Namespace => {
            imports.namespaces.push((local.as_str(), preserved.type_only));
            continue;
          }
        }
        imports.type_only =
          Some(imports.type_only.unwrap_or(true) && preserved.type_only);
      }
    }

    let mut items = Vec::new();
    for (module, imports) in modules {
      if imports.default.is_some() || !imports.named.is_empty() {
        // `import type` can not combine a default with named bindings
        let type_only = imports.type_only.unwrap_or(false)
          && (imports.default.is_none() || imports.named.is_empty());
        let specifiers = imports
          .default
          .map(import_default_specifier)
          .into_iter()
          .chain(imports.named)
          .collect();
        items.push(import_decl(specifiers, module, type_only));
      }
      for (local, type_only) in imports.namespaces {
        items.push(import_decl(
          vec![import_star_as_specifier(local)],
          module,
          type_only,
        ));
      }
    }
    for module in &self.side_effect_imports {
      let already_imported = self
        .preserved_imports
        .keys()
        .any(|(imported_module, _)| imported_module == module);
      if !already_imported {
        items.push(import_decl(Vec::new(), module, false));
      }
    }
    items
  }

  fn finish(mut self) -> MergedChunk {
    let mut body = self.hoisted_imports();
    body.extend(dedupe_exports(std::mem::take(&mut self.root.items)));
    let chunk = self.options.chunk;
    MergedChunk {
      chunk_id: chunk.id,
      file_name: chunk.file_name.clone(),
      specifier: chunk.specifier.clone(),
      module: Module {
        span: DUMMY_SP,
        body,
        shebang: None,
      },
      bindings: self.bindings,
    }
  }
}

fn reexport_src(item: &ModuleItem) -> Option<String> {
  match item {
    ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) => {
      // `export * as NS` is inlined into a namespace block on demand
      let only_namespaces = named
        .specifiers
        .iter()
        .all(|specifier| matches!(specifier, ExportSpecifier::Namespace(_)));
      if only_namespaces {
        None
      } else {
        named.src.as_deref().map(str_value)
      }
    }
    ModuleItem::ModuleDecl(ModuleDecl::ExportAll(export_all)) => {
      Some(str_value(&export_all.src))
    }
    _ => None,
  }
}

/// `import x = require("./a")` is merged like `import * as x from "./a"`.
fn require_as_import(import_equals: &TsImportEqualsDecl) -> ImportDecl {
  let src = match &import_equals.module_ref {
    TsModuleRef::TsExternalModuleRef(module_ref) => module_ref.expr.clone(),
    TsModuleRef::TsEntityName(_) => {
      unreachable!("import equals of an entity name is not a require")
    }
  };
  ImportDecl {
    span: import_equals.span,
    specifiers: vec![import_star_as_specifier(&import_equals.id.sym)],
    src: Box::new(src),
    type_only: import_equals.is_type_only,
    with: None,
    phase: Default::default(),
  }
}

/// Derives an identifier for the namespace of a file referenced without a
/// name, such as `import("./a")`.
fn namespace_name_for_file(specifier: &ModuleSpecifier) -> String {
  let mut name = specifier_stem(specifier)
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '_' || c == '$' {
        c
      } else {
        '_'
      }
    })
    .collect::<String>();
  if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
    name.insert(0, '_');
  }
  name
}

/// Exports the members of a synthesized namespace block. Declarations
/// named like the export get the `export` keyword, other bindings are
/// aliased with `export import name = binding`.
fn export_namespace_members(
  body: Vec<ModuleItem>,
  exports: &[(String, String)],
) -> Vec<ModuleItem> {
  let mut direct = IndexSet::new();
  let mut aliases = Vec::new();
  for (exported, canonical) in exports {
    if exported == canonical {
      direct.insert(canonical.as_str());
    } else {
      aliases.push(import_equals_alias(exported, canonical, true));
    }
  }
  let mut found = HashSet::new();
  let mut output = body
    .into_iter()
    .map(|item| {
      let exported = namespace_member_names(&item)
        .into_iter()
        .filter(|name| direct.contains(name.as_str()))
        .collect::<Vec<_>>();
      if exported.is_empty() {
        item
      } else {
        found.extend(exported);
        export_member(item)
      }
    })
    .collect::<Vec<_>>();
  for name in direct {
    if !found.contains(name) {
      log::warn!(
        "Skipping export of '{}' since it refers to itself in its namespace",
        name
      );
    }
  }
  output.extend(aliases);
  output
}

fn namespace_member_names(item: &ModuleItem) -> Vec<String> {
  let idents = match item {
    ModuleItem::Stmt(Stmt::Decl(decl)) => decl_binding_idents(decl),
    ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(import_equals)) => {
      vec![import_equals.id.clone()]
    }
    _ => Vec::new(),
  };
  idents.into_iter().map(|ident| ident.sym.to_string()).collect()
}

fn export_member(item: ModuleItem) -> ModuleItem {
  match item {
    ModuleItem::Stmt(Stmt::Decl(decl)) => {
      ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
        span: decl.span(),
        decl,
      }))
    }
    ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(mut import_equals)) => {
      import_equals.is_export = true;
      ModuleItem::ModuleDecl(ModuleDecl::TsImportEquals(import_equals))
    }
    item => item,
  }
}

/// Drops exports of names that an earlier statement already exported and
/// repeated `export *` statements.
fn dedupe_exports(items: Vec<ModuleItem>) -> Vec<ModuleItem> {
  let mut seen_names = HashSet::new();
  for item in &items {
    let ModuleItem::ModuleDecl(module_decl) = item else {
      continue;
    };
    match module_decl {
      ModuleDecl::ExportDecl(export_decl) => {
        for ident in decl_binding_idents(&export_decl.decl) {
          seen_names.insert(ident.sym.to_string());
        }
      }
      ModuleDecl::ExportDefaultDecl(_) | ModuleDecl::ExportDefaultExpr(_) => {
        seen_names.insert("default".to_string());
      }
      ModuleDecl::TsImportEquals(import_equals) if import_equals.is_export => {
        seen_names.insert(import_equals.id.sym.to_string());
      }
      _ => {}
    }
  }

  let mut seen_stars = HashSet::new();
  let mut has_empty_export = false;
  let mut output = Vec::with_capacity(items.len());
  for item in items {
    match item {
      ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(mut named)) => {
        if named.specifiers.is_empty() {
          if named.src.is_some() || !has_empty_export {
            has_empty_export |= named.src.is_none();
            output.push(ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)));
          }
          continue;
        }
        named.specifiers.retain(|specifier| {
          let name = export_specifier_name(specifier);
          let is_new = seen_names.insert(name.clone());
          if !is_new {
            log::debug!("Dropping duplicate export of '{}'", name);
          }
          is_new
        });
        if !named.specifiers.is_empty() {
          output.push(ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)));
        }
      }
      ModuleItem::ModuleDecl(ModuleDecl::ExportAll(export)) => {
        if seen_stars.insert(str_value(&export.src)) {
          output.push(ModuleItem::ModuleDecl(ModuleDecl::ExportAll(export)));
        }
      }
      item => output.push(item),
    }
  }
  output
}

fn export_specifier_name(specifier: &ExportSpecifier) -> String {
  match specifier {
    ExportSpecifier::Named(named) => named
      .exported
      .as_ref()
      .map(module_export_name_text)
      .unwrap_or_else(|| module_export_name_text(&named.orig)),
    ExportSpecifier::Namespace(namespace) => {
      module_export_name_text(&namespace.name)
    }
    ExportSpecifier::Default(_) => {
      unreachable!("export default from is stage 1")
    }
  }
}

#[derive(Default)]
struct ImportTypeCollector {
  keys: IndexSet<ImportTypeKey>,
}

impl Visit for ImportTypeCollector {
  fn visit_ts_import_type(&mut self, n: &TsImportType) {
    self.keys.insert(import_type_key(n));
    n.visit_children_with(self);
  }
}

fn import_type_key(import_type: &TsImportType) -> ImportTypeKey {
  (
    str_value(&import_type.arg),
    import_type
      .qualifier
      .as_ref()
      .map(|qualifier| leftmost_ident(qualifier).sym.to_string()),
  )
}

struct ImportTypeRewriter<'a> {
  targets: &'a HashMap<ImportTypeKey, ImportTypeTarget>,
}

impl ImportTypeRewriter<'_> {
  /// Gets the entity an import type refers to, or rewrites its module
  /// specifier in place when it stays an import type.
  fn rewrite(&self, import_type: &mut TsImportType) -> Option<TsEntityName> {
    match self.targets.get(&import_type_key(import_type))? {
      ImportTypeTarget::Binding(name) => {
        Some(match import_type.qualifier.take() {
          Some(mut qualifier) => {
            leftmost_ident_mut(&mut qualifier).sym = name.as_str().into();
            qualifier
          }
          None => TsEntityName::Ident(ident(name)),
        })
      }
      ImportTypeTarget::Specifier(specifier) => {
        import_type.arg = str_lit(specifier);
        None
      }
    }
  }
}

impl VisitMut for ImportTypeRewriter<'_> {
  fn visit_mut_ts_type(&mut self, n: &mut TsType) {
    n.visit_mut_children_with(self);
    let TsType::TsImportType(import_type) = n else {
      return;
    };
    let had_qualifier = import_type.qualifier.is_some();
    let span = import_type.span;
    let Some(entity_name) = self.rewrite(import_type) else {
      return;
    };
    let type_args = import_type.type_args.take();
    *n = if had_qualifier {
      type_ref(entity_name, type_args)
    } else {
      // a module used as a type is the type of its namespace
      TsType::TsTypeQuery(TsTypeQuery {
        span,
        expr_name: TsTypeQueryExpr::TsEntityName(entity_name),
        type_args,
      })
    };
  }

  fn visit_mut_ts_type_query(&mut self, n: &mut TsTypeQuery) {
    n.visit_mut_children_with(self);
    let TsTypeQueryExpr::Import(import_type) = &mut n.expr_name else {
      return;
    };
    let Some(entity_name) = self.rewrite(import_type) else {
      return;
    };
    let type_args = import_type.type_args.take();
    n.expr_name = TsTypeQueryExpr::TsEntityName(entity_name);
    if n.type_args.is_none() {
      n.type_args = type_args;
    }
  }
}
