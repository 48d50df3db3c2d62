// Copyright 2018-2024 the Deno authors. MIT license.

use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::IndexSet;
use serde::Deserialize;
use serde::Serialize;

use crate::bundler::BundleError;
use crate::module_specifier::strip_declaration_extension;
use crate::module_specifier::ModuleSpecifier;
use crate::module_specifier::DECLARATION_EXTENSIONS;

pub type ChunkId = usize;

/// The extensions a chunk module may have on disk.
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &[
  ".ts", ".tsx", ".mts", ".cts", ".d.ts", ".d.mts", ".d.cts", ".js", ".jsx",
  ".mjs", ".cjs",
];

/// A chunk emitted by a JavaScript bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
  /// File name of the chunk relative to the output directory.
  pub file_name: String,
  #[serde(default)]
  pub is_entry: bool,
  /// The modules the bundler placed in the chunk, in bundler order.
  pub modules: Vec<ModuleSpecifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedChunk {
  pub id: ChunkId,
  pub file_name: String,
  /// Location of the declaration file emitted for this chunk.
  pub specifier: ModuleSpecifier,
  pub is_entry: bool,
  pub modules: IndexSet<ModuleSpecifier>,
  /// Modules the merger starts from. The last module for an entry chunk,
  /// otherwise every module in reverse order.
  pub entry_modules: Vec<ModuleSpecifier>,
}

/// Gets the declaration file name for a chunk file name
/// (`index.js` -> `index.d.ts`).
pub fn declaration_file_name(file_name: &str) -> String {
  let stem = strip_declaration_extension(file_name);
  let ext = if file_name.ends_with(".mjs") || file_name.ends_with(".mts") {
    ".d.mts"
  } else if file_name.ends_with(".cjs") || file_name.ends_with(".cts") {
    ".d.cts"
  } else {
    ".d.ts"
  };
  format!("{}{}", stem, ext)
}

/// Places the declaration file of every chunk in `out_dir`, identifying
/// chunks by their position.
pub fn normalize_chunks(
  chunks: &[Chunk],
  out_dir: &ModuleSpecifier,
) -> Result<Vec<NormalizedChunk>, BundleError> {
  chunks
    .iter()
    .enumerate()
    .map(|(id, chunk)| {
      normalize_chunk(id, chunk, out_dir).map_err(|source| {
        BundleError::InvalidChunkFileName {
          file_name: chunk.file_name.clone(),
          source,
        }
      })
    })
    .collect()
}

fn normalize_chunk(
  id: ChunkId,
  chunk: &Chunk,
  out_dir: &ModuleSpecifier,
) -> Result<NormalizedChunk, url::ParseError> {
  let file_name =
    declaration_file_name(chunk.file_name.trim_start_matches("./"));
  let specifier = out_dir.join(&file_name)?;
  let modules = chunk.modules.iter().cloned().collect::<IndexSet<_>>();
  let entry_modules = if chunk.is_entry {
    modules.last().cloned().into_iter().collect()
  } else {
    modules.iter().rev().cloned().collect()
  };
  Ok(NormalizedChunk {
    id,
    file_name,
    specifier,
    is_entry: chunk.is_entry,
    modules,
    entry_modules,
  })
}

/// Maps original modules to the chunk that contains them.
pub struct ChunkMembership<'a> {
  chunks: &'a [NormalizedChunk],
  supported_extensions: Vec<String>,
  cache: RefCell<HashMap<ModuleSpecifier, Option<ChunkId>>>,
}

impl<'a> ChunkMembership<'a> {
  pub fn new(
    chunks: &'a [NormalizedChunk],
    supported_extensions: &[String],
  ) -> Self {
    Self {
      chunks,
      supported_extensions: supported_extensions.to_vec(),
      cache: Default::default(),
    }
  }

  pub fn get(&self, id: ChunkId) -> Option<&'a NormalizedChunk> {
    self.chunks.get(id)
  }

  /// Gets the chunk containing `specifier`, or `None` when the module is
  /// external to the bundle.
  pub fn chunk_for(&self, specifier: &ModuleSpecifier) -> Option<ChunkId> {
    if let Some(cached) = self.cache.borrow().get(specifier) {
      return *cached;
    }
    let found = self.find_chunk(specifier);
    self.cache.borrow_mut().insert(specifier.clone(), found);
    found
  }

  fn find_chunk(&self, specifier: &ModuleSpecifier) -> Option<ChunkId> {
    let candidates = self.candidates(specifier);
    self.chunks.iter().find_map(|chunk| {
      candidates
        .iter()
        .any(|candidate| chunk.modules.contains(candidate))
        .then_some(chunk.id)
    })
  }

  /// The file itself, its directory index and the file with each
  /// supported extension substituted.
  fn candidates(&self, specifier: &ModuleSpecifier) -> Vec<ModuleSpecifier> {
    let path = specifier.path().trim_end_matches('/').to_string();
    let mut candidates = vec![specifier.clone()];
    for base in [path.clone(), format!("{}/index", path)] {
      let stem = strip_declaration_extension(&base);
      let extensions = self
        .supported_extensions
        .iter()
        .map(|s| s.as_str())
        .chain(DECLARATION_EXTENSIONS.iter().copied());
      for ext in std::iter::once("").chain(extensions) {
        let mut candidate = specifier.clone();
        if ext.is_empty() {
          candidate.set_path(&base);
        } else {
          candidate.set_path(&format!("{}{}", stem, ext));
        }
        candidates.push(candidate);
      }
    }
    candidates
  }
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  fn url(text: &str) -> ModuleSpecifier {
    ModuleSpecifier::parse(text).unwrap()
  }

  fn supported() -> Vec<String> {
    DEFAULT_SUPPORTED_EXTENSIONS
      .iter()
      .map(|s| s.to_string())
      .collect()
  }

  #[test]
  fn deserializes_chunks() {
    let chunks: Vec<Chunk> = serde_json::from_str(
      r#"[{
        "fileName": "index.js",
        "isEntry": true,
        "modules": ["file:///src/a.ts", "file:///src/index.ts"]
      }, {
        "fileName": "shared.js",
        "modules": ["file:///src/shared.ts"]
      }]"#,
    )
    .unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].is_entry);
    assert!(!chunks[1].is_entry);
  }

  #[test]
  fn entry_modules() {
    let out_dir = url("file:///dist/");
    let chunks = normalize_chunks(
      &[
        Chunk {
          file_name: "index.js".to_string(),
          is_entry: true,
          modules: vec![url("file:///src/a.ts"), url("file:///src/index.ts")],
        },
        Chunk {
          file_name: "shared.mjs".to_string(),
          is_entry: false,
          modules: vec![url("file:///src/b.ts"), url("file:///src/c.ts")],
        },
      ],
      &out_dir,
    )
    .unwrap();
    assert_eq!(chunks[0].specifier.as_str(), "file:///dist/index.d.ts");
    assert_eq!(chunks[0].entry_modules, vec![url("file:///src/index.ts")]);
    assert_eq!(chunks[1].file_name, "shared.d.mts");
    assert_eq!(
      chunks[1].entry_modules,
      vec![url("file:///src/c.ts"), url("file:///src/b.ts")]
    );
  }

  #[test]
  fn membership_matches_declaration_files() {
    let out_dir = url("file:///dist/");
    let chunks = normalize_chunks(
      &[Chunk {
        file_name: "index.js".to_string(),
        is_entry: true,
        modules: vec![
          url("file:///src/a.ts"),
          url("file:///src/dir/index.ts"),
          url("file:///src/index.ts"),
        ],
      }],
      &out_dir,
    )
    .unwrap();
    let membership = ChunkMembership::new(&chunks, &supported());
    assert_eq!(membership.chunk_for(&url("file:///src/a.d.ts")), Some(0));
    assert_eq!(membership.chunk_for(&url("file:///src/a.ts")), Some(0));
    assert_eq!(membership.chunk_for(&url("file:///src/dir")), Some(0));
    assert_eq!(membership.chunk_for(&url("file:///src/b.d.ts")), None);
    // cached
    assert_eq!(membership.chunk_for(&url("file:///src/b.d.ts")), None);
    assert_eq!(membership.cache.borrow().len(), 4);
  }

  #[test]
  fn invalid_file_name_errors() {
    let err = normalize_chunks(
      &[Chunk {
        file_name: "//[::1".to_string(),
        is_entry: true,
        modules: vec![url("file:///src/index.ts")],
      }],
      &url("file:///dist/"),
    )
    .unwrap_err();
    match err {
      BundleError::InvalidChunkFileName { file_name, .. } => {
        assert_eq!(file_name, "//[::1");
      }
      err => panic!("unexpected error: {}", err),
    }
  }
}
