// Copyright 2018-2024 the Deno authors. All rights reserved. MIT license.

// These tests only use the public API of the crate.

use std::collections::HashSet;
use std::sync::Arc;

use dts_bundler::bundler::declare_modifier::ensure_declare_module_item;
use dts_bundler::bundler::declare_modifier::ensure_no_declare_module_item;
use dts_bundler::bundler::declare_modifier::map_module_items;
use dts_bundler::BundleError;
use dts_bundler::BundleOptions;
use dts_bundler::Chunk;
use dts_bundler::DeclarationBundler;
use dts_bundler::DeclarationFiles;
use dts_bundler::DeclarationTransformer;
use dts_bundler::DefaultModuleParser;
use dts_bundler::DefaultResolver;
use dts_bundler::EnsureNoDeclareTransformer;
use dts_bundler::ModuleParser;
use dts_bundler::ModuleSpecifier;
use dts_bundler::ParseOptions;
use dts_bundler::Resolver;
use pretty_assertions::assert_eq;

fn url(text: &str) -> ModuleSpecifier {
  ModuleSpecifier::parse(text).unwrap()
}

fn normalize(text: &str) -> String {
  text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn files(files: &[(&str, &str)]) -> DeclarationFiles {
  DeclarationFiles::parse(
    files.iter().map(|(name, text)| {
      (url(&format!("file:///src/{}", name)), Arc::from(*text))
    }),
    &DefaultModuleParser,
  )
  .unwrap()
}

fn chunk(file_name: &str, is_entry: bool, modules: &[&str]) -> Chunk {
  Chunk {
    file_name: file_name.to_string(),
    is_entry,
    modules: modules
      .iter()
      .map(|name| url(&format!("file:///src/{}", name)))
      .collect(),
  }
}

fn bundle_with_options(
  files: &DeclarationFiles,
  chunks: &[Chunk],
  options: BundleOptions,
) -> Vec<String> {
  DeclarationBundler::new(files, url("file:///dist/"), options)
    .bundle_to_text(chunks)
    .unwrap()
    .into_iter()
    .map(|output| normalize(&output.text))
    .collect()
}

fn bundle(files: &DeclarationFiles, chunks: &[Chunk]) -> Vec<String> {
  bundle_with_options(files, chunks, BundleOptions::default())
}

#[test]
fn chunk_deserializes_from_bundler_output() {
  let parsed: Chunk = serde_json::from_str(
    r#"{ "fileName": "index.js", "modules": ["file:///src/index.ts"] }"#,
  )
  .unwrap();
  assert_eq!(parsed, chunk("index.js", false, &["index.ts"]));
}

#[test]
fn inlines_each_file_once() {
  let files = files(&[
    ("shared.d.ts", "export interface Shared { value: string; }"),
    (
      "a.d.ts",
      "import { Shared } from \"./shared\";\nexport declare const a: Shared;",
    ),
    (
      "b.d.ts",
      "import { Shared } from \"./shared\";\nexport declare const b: Shared;",
    ),
    ("index.d.ts", "export { a } from \"./a\";\nexport { b } from \"./b\";"),
  ]);
  let output = bundle(
    &files,
    &[chunk(
      "index.js",
      true,
      &["shared.ts", "a.ts", "b.ts", "index.ts"],
    )],
  );
  assert_eq!(output.len(), 1);
  assert_eq!(output[0].matches("interfaceShared{").count(), 1);
  assert!(output[0].contains("declareconsta:Shared;"), "{}", output[0]);
  assert!(output[0].contains("declareconstb:Shared;"), "{}", output[0]);
}

#[test]
fn imports_files_of_other_chunks() {
  let files = files(&[
    ("shared.d.ts", "export interface Shared {}"),
    (
      "index.d.ts",
      "export { Shared } from \"./shared\";\nexport declare const x: 1;",
    ),
    (
      "other.d.ts",
      "import { Shared } from \"./shared\";\nexport declare const y: Shared;",
    ),
  ]);
  let output = bundle(
    &files,
    &[
      chunk("index.js", true, &["shared.ts", "index.ts"]),
      chunk("other.js", true, &["other.ts"]),
    ],
  );
  assert!(output[0].contains("interfaceShared{}"), "{}", output[0]);
  assert!(
    output[1].contains("import{Shared}from\"./index\";"),
    "{}",
    output[1]
  );
  assert!(!output[1].contains("interface"), "{}", output[1]);
}

#[test]
fn top_level_names_are_unique() {
  let files = files(&[
    ("a.d.ts", "export interface Item { a: string; }"),
    ("b.d.ts", "export interface Item { b: string; }"),
    ("c.d.ts", "export interface Item { c: string; }"),
    (
      "index.d.ts",
      r#"import { Item as A } from "./a";
import { Item as B } from "./b";
import { Item as C } from "./c";
export interface Item { a: A; b: B; c: C; }
"#,
    ),
  ]);
  let merged = DeclarationBundler::new(
    &files,
    url("file:///dist/"),
    BundleOptions::default(),
  )
  .bundle(&[chunk("index.js", true, &["a.ts", "b.ts", "c.ts", "index.ts"])])
  .unwrap();
  let bindings = &merged[0].bindings;
  assert_eq!(bindings.len(), 4);
  let names = bindings.values().collect::<HashSet<_>>();
  assert_eq!(names.len(), 4);
  let index_item = bindings
    .iter()
    .find(|(id, _)| id.specifier.path() == "/src/index.d.ts")
    .map(|(_, name)| name.as_str());
  assert_eq!(index_item, Some("Item"));
}

#[test]
fn uses_custom_resolver() {
  struct AliasResolver<'a> {
    inner: DefaultResolver<'a>,
  }

  impl Resolver for AliasResolver<'_> {
    fn resolve(
      &self,
      specifier: &str,
      referrer: &ModuleSpecifier,
    ) -> Option<ModuleSpecifier> {
      match specifier.strip_prefix("@app/") {
        Some(rest) => {
          ModuleSpecifier::parse(&format!("file:///src/{}.d.ts", rest)).ok()
        }
        None => self.inner.resolve(specifier, referrer),
      }
    }
  }

  let files = files(&[
    ("util.d.ts", "export interface Util { run(): void; }"),
    (
      "index.d.ts",
      "import { Util } from \"@app/util\";\nexport declare const u: Util;",
    ),
  ]);
  let resolver = AliasResolver {
    inner: DefaultResolver::new(&files),
  };
  let output = bundle_with_options(
    &files,
    &[chunk("index.js", true, &["util.ts", "index.ts"])],
    BundleOptions {
      resolver: Some(&resolver),
      ..Default::default()
    },
  );
  assert_eq!(
    output[0],
    normalize("interface Util { run(): void; } export declare const u: Util;")
  );
}

#[test]
fn runs_custom_transformers() {
  let files = files(&[(
    "index.d.ts",
    "declare function helper(): void;\nexport declare const VERSION: string;",
  )]);
  let output = bundle_with_options(
    &files,
    &[chunk("index.js", true, &["index.ts"])],
    BundleOptions {
      transformers: vec![
        &EnsureNoDeclareTransformer as &dyn DeclarationTransformer,
      ],
      ..Default::default()
    },
  );
  assert_eq!(
    output[0],
    normalize("function helper(): void; export const VERSION: string;")
  );
}

#[test]
fn errors_for_missing_declaration_files() {
  let files = files(&[("index.d.ts", "export {};")]);
  let result = DeclarationBundler::new(
    &files,
    url("file:///dist/"),
    BundleOptions::default(),
  )
  .bundle_to_text(&[chunk("index.js", true, &["missing.d.ts", "index.ts"])]);
  match result {
    Err(BundleError::MissingFile { specifier, chunk }) => {
      assert_eq!(specifier, url("file:///src/missing.d.ts"));
      assert_eq!(chunk, "index.d.ts");
    }
    other => panic!("unexpected result: {:?}", other.map(|_| ())),
  }

  let result = DeclarationBundler::new(
    &files,
    url("file:///dist/"),
    BundleOptions::default(),
  )
  .bundle(&[chunk("main.js", true, &["main.ts"])]);
  assert!(matches!(result, Err(BundleError::MissingEntry { .. })));
}

#[test]
fn declare_normalization_is_idempotent() {
  let specifier = url("file:///src/index.d.ts");
  let module = DefaultModuleParser
    .parse_declaration_module(ParseOptions {
      specifier: &specifier,
      source: Arc::from(
        "class A {}\ndeclare function f(): void;\nexport declare enum E { A }\ninterface I {}",
      ),
    })
    .unwrap();
  let module = dts_bundler::module_from_parsed_source(&module);

  let declared = map_module_items(&module.body, ensure_declare_module_item);
  assert!(matches!(declared, std::borrow::Cow::Owned(_)));
  let declared_again = map_module_items(&declared, ensure_declare_module_item);
  assert!(matches!(declared_again, std::borrow::Cow::Borrowed(_)));

  let stripped = map_module_items(&declared, ensure_no_declare_module_item);
  let stripped_again =
    map_module_items(&stripped, ensure_no_declare_module_item);
  assert!(matches!(stripped_again, std::borrow::Cow::Borrowed(_)));
}
