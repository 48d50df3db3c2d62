// Copyright 2018-2024 the Deno authors. MIT license.

/// The outcome of visiting a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitResult<T> {
  Unchanged,
  Replaced(T),
  Multiple(Vec<T>),
  Removed,
}

/// A visit result along with the nodes that should be placed before and
/// after it in the containing list.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed<T> {
  pub prepend: Vec<T>,
  pub result: VisitResult<T>,
  pub append: Vec<T>,
}

impl<T> Placed<T> {
  pub fn unchanged() -> Self {
    Self::new(VisitResult::Unchanged)
  }

  pub fn new(result: VisitResult<T>) -> Self {
    Self {
      prepend: Vec::new(),
      result,
      append: Vec::new(),
    }
  }

  pub fn with_append(mut self, nodes: impl IntoIterator<Item = T>) -> Self {
    self.append.extend(nodes);
    self
  }

  pub fn with_prepend(mut self, nodes: impl IntoIterator<Item = T>) -> Self {
    self.prepend.extend(nodes);
    self
  }

  /// Pushes the placed nodes into `out`, using `original` when the visited
  /// node was left unchanged.
  pub fn splice(self, original: T, out: &mut Vec<T>) {
    out.extend(self.prepend);
    out.extend(self.result.into_nodes(original));
    out.extend(self.append);
  }
}

impl<T> VisitResult<T> {
  /// Gets the nodes that take the place of `original`.
  pub fn into_nodes(self, original: T) -> Vec<T> {
    match self {
      VisitResult::Unchanged => vec![original],
      VisitResult::Replaced(node) => vec![node],
      VisitResult::Multiple(nodes) => nodes,
      VisitResult::Removed => Vec::new(),
    }
  }

  /// Applies `f` to every node of the result, resolving `Unchanged` to
  /// `original` when `f` changes it.
  pub fn map_nodes(self, original: &T, f: impl Fn(T) -> T) -> Self
  where
    T: Clone + PartialEq,
  {
    match self {
      VisitResult::Unchanged => {
        let mapped = f(original.clone());
        if mapped == *original {
          VisitResult::Unchanged
        } else {
          VisitResult::Replaced(mapped)
        }
      }
      VisitResult::Replaced(node) => VisitResult::Replaced(f(node)),
      VisitResult::Multiple(nodes) => {
        VisitResult::Multiple(nodes.into_iter().map(f).collect())
      }
      VisitResult::Removed => VisitResult::Removed,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn splices_in_order() {
    let mut out = vec![0];
    Placed::new(VisitResult::Replaced(2))
      .with_prepend([1])
      .with_append([3, 4])
      .splice(99, &mut out);
    Placed::<i32>::unchanged().splice(5, &mut out);
    Placed::new(VisitResult::Removed).with_append([6]).splice(99, &mut out);
    Placed::new(VisitResult::Multiple(vec![7, 8])).splice(99, &mut out);
    assert_eq!(out, vec![0, 1, 2, 3, 4, 5, 6, 7, 8]);
  }

  #[test]
  fn maps_nodes() {
    let double = |n: i32| n * 2;
    let keep = |n: i32| n;
    assert_eq!(
      VisitResult::Unchanged.map_nodes(&1, keep),
      VisitResult::Unchanged
    );
    assert_eq!(
      VisitResult::Unchanged.map_nodes(&1, double),
      VisitResult::Replaced(2)
    );
    assert_eq!(
      VisitResult::Multiple(vec![1, 2]).map_nodes(&0, double),
      VisitResult::Multiple(vec![2, 4])
    );
    assert_eq!(
      VisitResult::Removed.map_nodes(&1, double),
      VisitResult::Removed
    );
    assert_eq!(VisitResult::Removed.into_nodes(1), Vec::<i32>::new());
  }
}
