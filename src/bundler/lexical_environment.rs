// Copyright 2018-2024 the Deno authors. MIT license.

use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::ModuleSpecifier;

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  HashSet::from([
    "abstract", "any", "as", "async", "await", "boolean", "break", "case",
    "catch", "class", "const", "constructor", "continue", "debugger",
    "declare", "default", "delete", "do", "else", "enum", "export", "extends",
    "false", "finally", "for", "from", "function", "get", "if", "implements",
    "import", "in", "infer", "instanceof", "interface", "is", "keyof", "let",
    "module", "namespace", "never", "new", "null", "number", "object",
    "package", "private", "protected", "public", "readonly", "require",
    "return", "set", "static", "string", "super", "switch", "symbol", "this",
    "throw", "true", "try", "type", "typeof", "undefined", "unique",
    "unknown", "var", "void", "while", "with", "yield",
  ])
});

/// The owner of a canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
  /// A declaration of a source file.
  File(ModuleSpecifier),
  /// A name the merger synthesized for the chunk, such as a preserved
  /// import or a namespace block. It never belongs to a source file, even
  /// when the chunk's output file shares a URL with one.
  Chunk,
}

#[derive(Debug, Default, Clone)]
struct ScopeFrame {
  /// (originating file, name in that file) -> canonical name
  bindings: IndexMap<(ModuleSpecifier, String), String>,
  /// canonical name -> owner
  owners: IndexMap<String, Owner>,
}

/// The names bound at each scope level of a chunk being merged.
///
/// Frames are reference counted so cloning an environment to descend into
/// a subtree is cheap. Only the innermost frame is ever written to.
#[derive(Debug, Clone)]
pub struct LexicalEnvironment {
  frames: Vec<Rc<ScopeFrame>>,
}

impl Default for LexicalEnvironment {
  fn default() -> Self {
    Self::new()
  }
}

impl LexicalEnvironment {
  pub fn new() -> Self {
    Self {
      frames: vec![Default::default()],
    }
  }

  /// Creates a copy of this environment with a fresh innermost frame.
  pub fn child(&self) -> Self {
    let mut frames = self.frames.clone();
    frames.push(Default::default());
    Self { frames }
  }

  /// Gets if `name` may be used by a declaration in `origin` without
  /// colliding with a binding that belongs to another file or to the
  /// chunk.
  pub fn is_identifier_free(
    &self,
    name: &str,
    origin: &ModuleSpecifier,
  ) -> bool {
    self
      .frames
      .iter()
      .all(|frame| match frame.owners.get(name) {
        Some(Owner::File(owner)) => owner == origin,
        Some(Owner::Chunk) => false,
        None => true,
      })
  }

  /// Gets if anything owns `name` in any frame.
  pub fn is_taken(&self, name: &str) -> bool {
    self
      .frames
      .iter()
      .any(|frame| frame.owners.contains_key(name))
  }

  /// Registers `canonical` as owned by `origin` in the innermost frame,
  /// mapping `original` (or the canonical name itself) to it.
  pub fn add_binding(
    &mut self,
    origin: &ModuleSpecifier,
    canonical: &str,
    original: Option<&str>,
  ) {
    let frame = self.innermost_mut();
    frame
      .owners
      .entry(canonical.to_string())
      .or_insert_with(|| Owner::File(origin.clone()));
    frame.bindings.insert(
      (origin.clone(), original.unwrap_or(canonical).to_string()),
      canonical.to_string(),
    );
  }

  /// Claims `name` for the chunk in the innermost frame. No source file
  /// may declare a claimed name.
  pub fn claim(&mut self, name: &str) {
    self
      .innermost_mut()
      .owners
      .entry(name.to_string())
      .or_insert(Owner::Chunk);
  }

  /// Maps `local` in `origin` to a binding owned by another file without
  /// claiming the canonical name.
  pub fn add_alias(
    &mut self,
    origin: &ModuleSpecifier,
    local: &str,
    canonical: &str,
  ) {
    self
      .innermost_mut()
      .bindings
      .insert((origin.clone(), local.to_string()), canonical.to_string());
  }

  /// Looks up the canonical name of `name` as seen from `origin`,
  /// innermost frame first.
  pub fn lookup(&self, origin: &ModuleSpecifier, name: &str) -> Option<&str> {
    let key = (origin.clone(), name.to_string());
    self
      .frames
      .iter()
      .rev()
      .find_map(|frame| frame.bindings.get(&key))
      .map(|s| s.as_str())
  }

  /// Looks up a binding of `origin` only in the innermost frame.
  pub fn lookup_own(
    &self,
    origin: &ModuleSpecifier,
    name: &str,
  ) -> Option<&str> {
    let key = (origin.clone(), name.to_string());
    self
      .frames
      .last()
      .and_then(|frame| frame.bindings.get(&key))
      .map(|s| s.as_str())
  }

  /// Makes the bindings `other` holds for `origins`, and every name
  /// `other` claimed for the chunk, visible in this environment.
  ///
  /// Names this environment already uses for something else keep their
  /// owner.
  pub fn inherit(
    &mut self,
    other: &LexicalEnvironment,
    origins: &[ModuleSpecifier],
  ) {
    for frame in &other.frames {
      for ((origin, name), canonical) in &frame.bindings {
        if !origins.contains(origin)
          || self.lookup(origin, name) == Some(canonical.as_str())
        {
          continue;
        }
        match frame.owners.get(canonical) {
          Some(Owner::File(owner)) if owner == origin => {
            if self.is_identifier_free(canonical, origin) {
              self.add_binding(origin, canonical, Some(name));
            } else {
              self.add_alias(origin, name, canonical);
            }
          }
          _ => self.add_alias(origin, name, canonical),
        }
      }
      for (name, owner) in &frame.owners {
        if *owner == Owner::Chunk && !self.is_taken(name) {
          self.claim(name);
        }
      }
    }
  }

  /// Gets `desired`, or the first of `desired_1`, `desired_2`, ... that
  /// nothing owns.
  pub fn generate_unique_binding(&self, desired: &str) -> String {
    unique_name(desired, |name| self.is_taken(name))
  }

  fn innermost_mut(&mut self) -> &mut ScopeFrame {
    if self.frames.is_empty() {
      self.frames.push(Default::default());
    }
    let last = self.frames.len() - 1;
    Rc::make_mut(&mut self.frames[last])
  }
}

/// Gets the first name among `desired` (with reserved words prefixed),
/// `desired_1`, `desired_2`, ... for which `is_taken` is false.
pub fn unique_name(desired: &str, is_taken: impl Fn(&str) -> bool) -> String {
  let base = ensure_nonreserved_word(desired);
  if !is_taken(&base) {
    return base;
  }
  let mut i = 1;
  loop {
    let candidate = format!("{}_{}", base, i);
    if !is_taken(&candidate) {
      return candidate;
    }
    i += 1;
  }
}

pub fn is_reserved_word(name: &str) -> bool {
  RESERVED_WORDS.contains(name)
}

/// Prefixes reserved words with an underscore.
pub fn ensure_nonreserved_word(name: &str) -> String {
  if is_reserved_word(name) {
    format!("_{}", name)
  } else {
    name.to_string()
  }
}
