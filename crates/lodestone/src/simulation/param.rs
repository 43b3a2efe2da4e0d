//! Per-item force parameters.

use std::{fmt, rc::Rc};

/// A force parameter that is either one value for every item, or computed
/// per item from the item and its index.
///
/// Parameters are resolved into a flat array when the simulation starts;
/// a function is not called again until the next start.
///
/// # Examples
///
/// ```
/// # use lodestone::simulation::{Node, Param};
/// // Stronger repulsion for well-connected nodes
/// let charge: Param<Node> = Param::per_item(|node: &Node, _| -30.0 * (1.0 + node.weight()));
/// let nodes = [Node::at(0.0, 0.0)];
/// assert_eq!(charge.resolve(&nodes), vec![-30.0]);
/// ```
pub enum Param<T> {
    Constant(f64),
    PerItem(Rc<dyn Fn(&T, usize) -> f64>),
}

impl<T> Param<T> {
    pub fn per_item<F>(f: F) -> Self
    where
        F: Fn(&T, usize) -> f64 + 'static,
    {
        Self::PerItem(Rc::new(f))
    }

    /// Evaluates the parameter for every item
    pub fn resolve(&self, items: &[T]) -> Vec<f64> {
        match self {
            Self::Constant(value) => vec![*value; items.len()],
            Self::PerItem(f) => items
                .iter()
                .enumerate()
                .map(|(index, item)| f(item, index))
                .collect(),
        }
    }
}

impl<T> Clone for Param<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Constant(value) => Self::Constant(*value),
            Self::PerItem(f) => Self::PerItem(Rc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::PerItem(_) => f.write_str("PerItem(..)"),
        }
    }
}

impl<T> From<f64> for Param<T> {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}
