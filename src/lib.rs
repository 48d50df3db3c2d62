// Copyright 2018-2024 the Deno authors. All rights reserved. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

mod ast;
pub mod bundler;
pub mod chunk;
mod collections;
mod module_specifier;
pub mod source;
mod swc_helpers;

pub use ast::module_from_parsed_source;
pub use ast::DefaultModuleParser;
pub use ast::ModuleParser;
pub use ast::ParseOptions;
pub use bundler::deconflict::DeclId;
pub use bundler::deconflict::DeconflictedBindings;
pub use bundler::module_merger::merge_chunk;
pub use bundler::module_merger::MergeChunkOptions;
pub use bundler::module_merger::MergedChunk;
pub use bundler::track_exports::track_exports;
pub use bundler::track_exports::ExportedSymbol;
pub use bundler::BundleError;
pub use bundler::BundleOptions;
pub use bundler::ChunkOutput;
pub use bundler::DeclarationBundler;
pub use bundler::DeclarationTransformer;
pub use bundler::EnsureDeclareTransformer;
pub use bundler::EnsureNoDeclareTransformer;
pub use bundler::IncludedSourceFiles;
pub use chunk::Chunk;
pub use chunk::ChunkMembership;
pub use chunk::NormalizedChunk;
pub use deno_ast::MediaType;
pub use module_specifier::resolve_import;
pub use module_specifier::ModuleSpecifier;
pub use module_specifier::SpecifierError;
pub use source::DeclarationFiles;
pub use source::DefaultResolver;
pub use source::Resolver;
pub use swc_helpers::emit_module;
