// Copyright 2018-2024 the Deno authors. MIT license.

use std::sync::Arc;

use deno_ast::swc::ast::Module;
use indexmap::IndexMap;

use crate::ast::module_from_parsed_source;
use crate::ast::ModuleParser;
use crate::ast::ParseOptions;
use crate::bundler::BundleError;
use crate::module_specifier::resolve_import;
use crate::module_specifier::strip_declaration_extension;
use crate::module_specifier::ModuleSpecifier;
use crate::module_specifier::DECLARATION_EXTENSIONS;

/// The per module declaration files that are candidates for bundling.
#[derive(Debug, Default, Clone)]
pub struct DeclarationFiles {
  files: IndexMap<ModuleSpecifier, Module>,
}

impl DeclarationFiles {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parses every source with the provided parser.
  pub fn parse(
    sources: impl IntoIterator<Item = (ModuleSpecifier, Arc<str>)>,
    parser: &dyn ModuleParser,
  ) -> Result<Self, BundleError> {
    let mut files = Self::new();
    for (specifier, source) in sources {
      let parsed = parser
        .parse_declaration_module(ParseOptions {
          specifier: &specifier,
          source,
        })
        .map_err(|diagnostic| BundleError::Parse {
          specifier: specifier.clone(),
          diagnostic: Box::new(diagnostic),
        })?;
      files.insert(specifier, module_from_parsed_source(&parsed));
    }
    Ok(files)
  }

  pub fn insert(&mut self, specifier: ModuleSpecifier, module: Module) {
    self.files.insert(specifier, module);
  }

  pub fn get(&self, specifier: &ModuleSpecifier) -> Option<&Module> {
    self.files.get(specifier)
  }

  pub fn contains(&self, specifier: &ModuleSpecifier) -> bool {
    self.files.contains_key(specifier)
  }

  /// Finds the declaration file emitted for a source module, for example
  /// `file:///a.d.ts` for `file:///a.ts`.
  pub fn find_for_module(
    &self,
    module: &ModuleSpecifier,
  ) -> Option<&ModuleSpecifier> {
    if let Some((specifier, _)) = self.files.get_key_value(module) {
      return Some(specifier);
    }
    let path = module.path();
    let stem = strip_declaration_extension(path);
    let candidates = DECLARATION_EXTENSIONS
      .iter()
      .map(|ext| format!("{}{}", stem, ext))
      .chain(
        DECLARATION_EXTENSIONS
          .iter()
          .map(|ext| format!("{}/index{}", path.trim_end_matches('/'), ext)),
      );
    for candidate in candidates {
      let mut specifier = module.clone();
      specifier.set_path(&candidate);
      if let Some((specifier, _)) = self.files.get_key_value(&specifier) {
        return Some(specifier);
      }
    }
    None
  }
}

/// Resolves the module specifiers found in declaration files.
pub trait Resolver {
  /// Resolves `specifier` found in `referrer`, returning `None` for
  /// specifiers that should be left untouched (bare specifiers).
  fn resolve(
    &self,
    specifier: &str,
    referrer: &ModuleSpecifier,
  ) -> Option<ModuleSpecifier>;
}

/// Resolves relative specifiers against the known declaration files,
/// trying declaration extensions and directory indexes.
pub struct DefaultResolver<'a> {
  files: &'a DeclarationFiles,
}

impl<'a> DefaultResolver<'a> {
  pub fn new(files: &'a DeclarationFiles) -> Self {
    Self { files }
  }
}

impl Resolver for DefaultResolver<'_> {
  fn resolve(
    &self,
    specifier: &str,
    referrer: &ModuleSpecifier,
  ) -> Option<ModuleSpecifier> {
    let resolved = match resolve_import(specifier, referrer) {
      Ok(resolved) => resolved,
      Err(err) => {
        log::debug!("Not resolving '{}': {}", specifier, err);
        return None;
      }
    };
    if resolved.scheme() != "file" {
      return Some(resolved);
    }
    Some(
      self
        .files
        .find_for_module(&resolved)
        .cloned()
        .unwrap_or(resolved),
    )
  }
}
