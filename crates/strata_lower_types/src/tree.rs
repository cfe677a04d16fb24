//! Values split along the structure of their aggregate type.

use strata_ir::ValueId;

/// A value of an aggregate type, split into its children.
///
/// A `Leaf` holds a value that was not decomposed further: a ground value
/// or a preserved aggregate. `Fields` holds one subtree per bundle field or
/// vector element, in declaration order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Tree<T> {
    /// A single value.
    Leaf(T),
    /// One subtree per child.
    Fields(Vec<Tree<T>>),
}

/// The lowered form of a value of the original body.
pub type Lowered = Tree<ValueId>;

impl<T> Tree<T> {
    /// The value of a leaf.
    pub fn leaf(&self) -> Option<&T> {
        match self {
            Tree::Leaf(v) => Some(v),
            Tree::Fields(_) => None,
        }
    }

    /// Subtree `index` of a `Fields` node.
    pub fn child(&self, index: usize) -> Option<&Tree<T>> {
        match self {
            Tree::Leaf(_) => None,
            Tree::Fields(children) => children.get(index),
        }
    }

    /// Every leaf in declaration order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'t>(&'t self, out: &mut Vec<&'t T>) {
        match self {
            Tree::Leaf(v) => out.push(v),
            Tree::Fields(children) => {
                for child in children {
                    child.collect(out);
                }
            }
        }
    }

    /// Applies `f` to every leaf, keeping the shape.
    pub fn map<U>(&self, f: &mut impl FnMut(&T) -> U) -> Tree<U> {
        match self {
            Tree::Leaf(v) => Tree::Leaf(f(v)),
            Tree::Fields(children) => {
                let mut out = Vec::with_capacity(children.len());
                for child in children {
                    out.push(child.map(&mut *f));
                }
                Tree::Fields(out)
            }
        }
    }
}
