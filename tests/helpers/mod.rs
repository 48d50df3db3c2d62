// Copyright 2018-2024 the Deno authors. All rights reserved. MIT license.

use std::sync::Arc;

use dts_bundler::BundleOptions;
use dts_bundler::Chunk;
use dts_bundler::ChunkOutput;
use dts_bundler::DeclarationBundler;
use dts_bundler::DeclarationFiles;
use dts_bundler::DefaultModuleParser;
use url::Url;

pub struct Spec {
  pub chunks: Vec<Chunk>,
  pub files: Vec<SpecFile>,
  pub output_file: SpecFile,
}

impl Spec {
  pub fn emit(&self) -> String {
    let mut text = String::new();
    text.push_str("# chunks\n");
    text.push_str(&serde_json::to_string_pretty(&self.chunks).unwrap());
    text.push_str("\n\n");
    for file in &self.files {
      text.push_str(&file.emit());
      text.push('\n');
    }
    text.push_str(&self.output_file.emit());
    if !text.ends_with('\n') {
      text.push('\n');
    }
    text
  }

  /// Bundles the spec's declaration files into `file:///dist/`.
  pub fn bundle(&self) -> Vec<ChunkOutput> {
    let files = DeclarationFiles::parse(
      self
        .files
        .iter()
        .map(|file| (file.url(), Arc::from(file.text.as_str()))),
      &DefaultModuleParser,
    )
    .unwrap();
    let bundler = DeclarationBundler::new(
      &files,
      Url::parse("file:///dist/").unwrap(),
      BundleOptions::default(),
    );
    bundler.bundle_to_text(&self.chunks).unwrap()
  }
}

#[derive(Debug)]
pub struct SpecFile {
  pub specifier: String,
  pub text: String,
}

impl SpecFile {
  pub fn emit(&self) -> String {
    format!("# {}\n{}", self.specifier, self.text)
  }

  pub fn url(&self) -> Url {
    if self.specifier.starts_with("file:") {
      Url::parse(&self.specifier).unwrap()
    } else {
      Url::parse(&format!("file:///{}", self.specifier)).unwrap()
    }
  }
}

/// Parses a spec made of `# <name>` sections: a `chunks` section holding
/// the chunk descriptions as JSON, the declaration files and the expected
/// `output`.
pub fn parse_spec(text: &str) -> Spec {
  let mut files = Vec::new();
  let mut current_file: Option<SpecFile> = None;
  for line in text.split('\n') {
    if let Some(specifier) = line.strip_prefix("# ") {
      if let Some(file) = current_file.take() {
        files.push(file);
      }
      current_file = Some(SpecFile {
        specifier: specifier.to_string(),
        text: String::new(),
      });
    } else {
      let current_file = current_file.as_mut().unwrap();
      if !current_file.text.is_empty() {
        current_file.text.push('\n');
      }
      current_file.text.push_str(line);
    }
  }
  files.push(current_file.unwrap());
  let output_file =
    files.remove(files.iter().position(|f| f.specifier == "output").unwrap());
  let chunks_file =
    files.remove(files.iter().position(|f| f.specifier == "chunks").unwrap());
  Spec {
    chunks: serde_json::from_str(&chunks_file.text).unwrap(),
    files,
    output_file,
  }
}

/// Prints the output of every chunk under a `## <file name>` heading.
pub fn outputs_to_text(outputs: &[ChunkOutput]) -> String {
  let mut text = String::new();
  for output in outputs {
    text.push_str(&format!("## {}\n", output.file_name));
    text.push_str(&output.text);
    if !text.ends_with('\n') {
      text.push('\n');
    }
  }
  text
}

/// Removes all whitespace so that comparisons do not depend on how the
/// printer lays out declarations.
pub fn normalize_whitespace(text: &str) -> String {
  text.chars().filter(|c| !c.is_whitespace()).collect()
}
