// Copyright 2018-2024 the Deno authors. MIT license.

use std::borrow::Cow;

use deno_ast::swc::ast::Module;
use deno_ast::ParseDiagnostic;

use self::declare_modifier::ensure_declare_module_item;
use self::declare_modifier::ensure_no_declare_module_item;
use self::declare_modifier::map_module_items;
use self::module_merger::merge_chunk;
use self::module_merger::MergeChunkOptions;
use self::module_merger::MergedChunk;
use crate::chunk::normalize_chunks;
use crate::chunk::Chunk;
use crate::chunk::ChunkMembership;
use crate::chunk::NormalizedChunk;
use crate::chunk::DEFAULT_SUPPORTED_EXTENSIONS;
use crate::collections::IncludedSet;
use crate::module_specifier::DECLARATION_EXTENSIONS;
use crate::source::DeclarationFiles;
use crate::source::DefaultResolver;
use crate::source::Resolver;
use crate::swc_helpers::emit_module;
use crate::ModuleSpecifier;

pub mod declare_modifier;
pub mod deconflict;
pub mod export_promotion;
pub mod lexical_environment;
pub mod module_merger;
pub mod placement;
pub mod track_exports;

/// Declaration files already inlined during one bundling run.
pub type IncludedSourceFiles = IncludedSet<ModuleSpecifier>;

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
  #[error("failed to parse {specifier}: {diagnostic}")]
  Parse {
    specifier: ModuleSpecifier,
    diagnostic: Box<ParseDiagnostic>,
  },
  #[error("no declaration file was found for the entry module {specifier} of chunk {chunk}")]
  MissingEntry {
    specifier: ModuleSpecifier,
    chunk: String,
  },
  #[error("chunk {chunk} contains the declaration file {specifier}, which was not provided")]
  MissingFile {
    specifier: ModuleSpecifier,
    chunk: String,
  },
  #[error("invalid chunk file name '{file_name}': {source}")]
  InvalidChunkFileName {
    file_name: String,
    #[source]
    source: url::ParseError,
  },
  #[error("failed to emit {file_name}: {inner:#}")]
  Emit {
    file_name: String,
    inner: anyhow::Error,
  },
}

/// A pass run over every declaration file before it is inlined.
pub trait DeclarationTransformer {
  fn transform(&self, specifier: &ModuleSpecifier, module: Module) -> Module;
}

/// Adds the `declare` modifier to top level declarations.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnsureDeclareTransformer;

impl DeclarationTransformer for EnsureDeclareTransformer {
  fn transform(&self, _specifier: &ModuleSpecifier, module: Module) -> Module {
    let changed =
      match map_module_items(&module.body, ensure_declare_module_item) {
      Cow::Borrowed(_) => None,
      Cow::Owned(body) => Some(body),
    };
    match changed {
      Some(body) => Module { body, ..module },
      None => module,
    }
  }
}

/// Removes the `declare` modifier from top level declarations.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnsureNoDeclareTransformer;

impl DeclarationTransformer for EnsureNoDeclareTransformer {
  fn transform(&self, _specifier: &ModuleSpecifier, module: Module) -> Module {
    let changed =
      match map_module_items(&module.body, ensure_no_declare_module_item) {
      Cow::Borrowed(_) => None,
      Cow::Owned(body) => Some(body),
    };
    match changed {
      Some(body) => Module { body, ..module },
      None => module,
    }
  }
}

pub struct BundleOptions<'a> {
  /// Resolves module specifiers. Defaults to [`DefaultResolver`].
  pub resolver: Option<&'a dyn Resolver>,
  /// Passes run over every inlined file, in order.
  pub transformers: Vec<&'a dyn DeclarationTransformer>,
  /// Extensions tried when matching files to the modules of a chunk.
  pub supported_extensions: Vec<String>,
}

impl Default for BundleOptions<'_> {
  fn default() -> Self {
    Self {
      resolver: None,
      transformers: vec![
        &EnsureDeclareTransformer as &dyn DeclarationTransformer,
      ],
      supported_extensions: DEFAULT_SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect(),
    }
  }
}

/// The printed declaration file of a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutput {
  pub file_name: String,
  pub specifier: ModuleSpecifier,
  pub text: String,
}

/// Merges per module declaration files into one declaration file per
/// chunk.
pub struct DeclarationBundler<'a> {
  files: &'a DeclarationFiles,
  out_dir: ModuleSpecifier,
  options: BundleOptions<'a>,
}

impl<'a> DeclarationBundler<'a> {
  pub fn new(
    files: &'a DeclarationFiles,
    out_dir: ModuleSpecifier,
    options: BundleOptions<'a>,
  ) -> Self {
    Self {
      files,
      out_dir,
      options,
    }
  }

  /// Merges every chunk, in order. Files inlined into one chunk are not
  /// inlined again by a later one.
  pub fn bundle(
    &self,
    chunks: &[Chunk],
  ) -> Result<Vec<MergedChunk>, BundleError> {
    let chunks = normalize_chunks(chunks, &self.out_dir)?;
    for chunk in &chunks {
      self.validate_chunk(chunk)?;
    }

    let membership =
      ChunkMembership::new(&chunks, &self.options.supported_extensions);
    let default_resolver = DefaultResolver::new(self.files);
    let resolver = self.options.resolver.unwrap_or(&default_resolver);
    let mut included = IncludedSourceFiles::default();
    let mut merged = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
      log::debug!("Merging declarations of chunk {}", chunk.file_name);
      merged.push(merge_chunk(
        MergeChunkOptions {
          chunk,
          files: self.files,
          resolver,
          membership: &membership,
          transformers: &self.options.transformers,
        },
        &mut included,
      ));
    }
    if included.is_empty() && !chunks.is_empty() {
      log::warn!("No declaration files were found for any chunk module");
    }
    Ok(merged)
  }

  /// Merges and prints every chunk.
  pub fn bundle_to_text(
    &self,
    chunks: &[Chunk],
  ) -> Result<Vec<ChunkOutput>, BundleError> {
    self
      .bundle(chunks)?
      .iter()
      .map(|merged| {
        let text = emit_module(&merged.module).map_err(|inner| {
          BundleError::Emit {
            file_name: merged.file_name.clone(),
            inner,
          }
        })?;
        Ok(ChunkOutput {
          file_name: merged.file_name.clone(),
          specifier: merged.specifier.clone(),
          text,
        })
      })
      .collect()
  }

  fn validate_chunk(
    &self,
    chunk: &NormalizedChunk,
  ) -> Result<(), BundleError> {
    for module in &chunk.modules {
      let is_declaration_file = DECLARATION_EXTENSIONS
        .iter()
        .any(|ext| module.path().ends_with(ext));
      if is_declaration_file && !self.files.contains(module) {
        return Err(BundleError::MissingFile {
          specifier: module.clone(),
          chunk: chunk.file_name.clone(),
        });
      }
    }
    if chunk.is_entry {
      for module in &chunk.entry_modules {
        if self.files.find_for_module(module).is_none() {
          return Err(BundleError::MissingEntry {
            specifier: module.clone(),
            chunk: chunk.file_name.clone(),
          });
        }
      }
    }
    Ok(())
  }
}
