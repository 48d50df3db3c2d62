// Copyright 2018-2024 the Deno authors. MIT license.

use std::sync::Arc;

use deno_ast::swc::ast::Module;
use deno_ast::swc::ast::ModuleItem;
use deno_ast::MediaType;
use deno_ast::ParseDiagnostic;
use deno_ast::ParsedSource;
use deno_ast::ProgramRef;

use crate::module_specifier::ModuleSpecifier;

pub struct ParseOptions<'a> {
  pub specifier: &'a ModuleSpecifier,
  pub source: Arc<str>,
}

/// Parses declaration files.
pub trait ModuleParser {
  fn parse_declaration_module(
    &self,
    options: ParseOptions,
  ) -> Result<ParsedSource, ParseDiagnostic>;
}

#[derive(Default, Clone)]
pub struct DefaultModuleParser;

impl ModuleParser for DefaultModuleParser {
  fn parse_declaration_module(
    &self,
    options: ParseOptions,
  ) -> Result<ParsedSource, ParseDiagnostic> {
    deno_ast::parse_module(deno_ast::ParseParams {
      specifier: options.specifier.clone(),
      text: options.source,
      media_type: MediaType::Dts,
      capture_tokens: false,
      scope_analysis: false,
      maybe_syntax: None,
    })
  }
}

/// Gets the module out of a parsed source, treating scripts as modules
/// with no imports or exports.
pub fn module_from_parsed_source(parsed_source: &ParsedSource) -> Module {
  match parsed_source.program_ref() {
    ProgramRef::Module(module) => module.clone(),
    ProgramRef::Script(script) => Module {
      span: script.span,
      body: script
        .body
        .iter()
        .cloned()
        .map(ModuleItem::Stmt)
        .collect(),
      shebang: script.shebang.clone(),
    },
  }
}

#[cfg(test)]
pub fn parse_declaration_text(specifier: &str, text: &str) -> Module {
  let specifier = ModuleSpecifier::parse(specifier).unwrap();
  let parsed = DefaultModuleParser
    .parse_declaration_module(ParseOptions {
      specifier: &specifier,
      source: text.into(),
    })
    .unwrap();
  module_from_parsed_source(&parsed)
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn parses_declaration_module() {
    let module = parse_declaration_text(
      "file:///a.d.ts",
      "export declare class Foo {}\nimport { Bar } from './bar';",
    );
    assert_eq!(module.body.len(), 2);
  }

  #[test]
  fn reports_parse_errors() {
    let specifier = ModuleSpecifier::parse("file:///a.d.ts").unwrap();
    let result = DefaultModuleParser.parse_declaration_module(ParseOptions {
      specifier: &specifier,
      source: "export declare class {".into(),
    });
    assert!(result.is_err());
  }
}
