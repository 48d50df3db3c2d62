// Copyright 2018-2024 the Deno authors. MIT license.

pub type ModuleSpecifier = url::Url;

pub use import_map::specifier::resolve_import;
pub use import_map::specifier::SpecifierError;

/// Declaration file extensions, longest first so that `.d.ts` wins over `.ts`.
pub const DECLARATION_EXTENSIONS: &[&str] = &[".d.ts", ".d.mts", ".d.cts"];

pub fn is_relative_specifier(specifier: &str) -> bool {
  specifier.starts_with("./") || specifier.starts_with("../")
}

/// Strips a declaration (`.d.ts`) or source extension off the last path
/// segment of the specifier text.
pub fn strip_declaration_extension(text: &str) -> &str {
  for ext in DECLARATION_EXTENSIONS {
    if let Some(stripped) = text.strip_suffix(ext) {
      return stripped;
    }
  }
  for ext in [".ts", ".mts", ".cts", ".tsx", ".js", ".mjs", ".cjs", ".jsx"] {
    if let Some(stripped) = text.strip_suffix(ext) {
      return stripped;
    }
  }
  text
}

/// Makes a module specifier that points from `from` to `to`, prefixed
/// with `./` when it stays in the same directory and with the declaration
/// extension removed.
pub fn relative_module_specifier(
  from: &ModuleSpecifier,
  to: &ModuleSpecifier,
) -> Option<String> {
  let relative = from.make_relative(to)?;
  let relative = strip_declaration_extension(&relative);
  if relative.starts_with("../") {
    Some(relative.to_string())
  } else {
    Some(format!("./{}", relative))
  }
}

/// Gets the file stem of the specifier without any declaration extension.
pub fn specifier_stem(specifier: &ModuleSpecifier) -> &str {
  let path = specifier.path();
  let file_name = path.rsplit('/').next().unwrap_or(path);
  strip_declaration_extension(file_name)
}

#[cfg(test)]
mod test {
  use crate::ModuleSpecifier;

  use super::*;

  #[test]
  fn test_relative_module_specifier() {
    let cases = [
      ("file:///dist/index.d.ts", "file:///dist/shared.d.ts", "./shared"),
      ("file:///dist/index.d.ts", "file:///dist/nested/a.d.ts", "./nested/a"),
      ("file:///dist/nested/a.d.ts", "file:///dist/b.d.ts", "../b"),
      ("file:///dist/index.d.ts", "file:///src/types.d.ts", "../src/types"),
    ];
    for (from, to, expected) in cases {
      let from = ModuleSpecifier::parse(from).unwrap();
      let to = ModuleSpecifier::parse(to).unwrap();
      assert_eq!(
        relative_module_specifier(&from, &to).as_deref(),
        Some(expected),
        "{} -> {}",
        from,
        to
      );
    }
  }

  #[test]
  fn test_specifier_stem() {
    let cases = [
      ("file:///src/my-utils.d.ts", "my-utils"),
      ("file:///src/index.d.mts", "index"),
      ("file:///src/a.ts", "a"),
      ("file:///src/b", "b"),
    ];
    for (specifier, expected) in cases {
      let url = ModuleSpecifier::parse(specifier).unwrap();
      assert_eq!(specifier_stem(&url), expected);
    }
  }

  #[test]
  fn test_is_relative_specifier() {
    assert!(is_relative_specifier("./a"));
    assert!(is_relative_specifier("../a"));
    assert!(!is_relative_specifier("react"));
    assert!(!is_relative_specifier("/abs/a"));
  }
}
