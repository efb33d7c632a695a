//! Dense row-major tensors and state-addressed builders.

use super::node::{NodeKind, StateRef};
use crate::error::DiagramError;

/// Dense row-major array of `f64`.
///
/// Probability tables have shape `(S[parents]..., S[node])`; utility tables
/// have shape `(S[parents]...)`. A zero-dimensional tensor holds one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<f64>,
}

fn strides_for(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

impl Tensor {
    /// Build a tensor, checking that `data` matches the shape.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, DiagramError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DiagramError::TensorSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            strides: strides_for(&shape),
            shape,
            data,
        })
    }

    /// Tensor of the given shape with every entry set to `value`.
    pub fn filled(shape: Vec<usize>, value: f64) -> Self {
        let len = shape.iter().product();
        Self {
            strides: strides_for(&shape),
            shape,
            data: vec![value; len],
        }
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::filled(shape, 0.0)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat offset of a full index, checking every coordinate.
    pub fn offset(&self, index: &[usize]) -> Result<usize, DiagramError> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, s)| i >= s) {
            return Err(DiagramError::IndexOutOfRange {
                index: index.to_vec(),
                shape: self.shape.clone(),
            });
        }
        Ok(index.iter().zip(&self.strides).map(|(i, s)| i * s).sum())
    }

    pub fn get(&self, index: &[usize]) -> Result<f64, DiagramError> {
        Ok(self.data[self.offset(index)?])
    }

    pub fn set(&mut self, index: &[usize], value: f64) -> Result<(), DiagramError> {
        let offset = self.offset(index)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Lookup by coordinates that are already known to be in range.
    pub(crate) fn at<I: IntoIterator<Item = usize>>(&self, index: I) -> f64 {
        let offset: usize = index
            .into_iter()
            .zip(&self.strides)
            .map(|(i, s)| i * s)
            .sum();
        self.data[offset]
    }

    /// Iterate over the rows along the last axis together with their
    /// leading index.
    pub fn rows(&self) -> impl Iterator<Item = (Vec<usize>, &[f64])> + '_ {
        let width = self.shape.last().copied().unwrap_or(1).max(1);
        let leading = &self.shape[..self.shape.len().saturating_sub(1)];
        self.data
            .chunks(width)
            .enumerate()
            .map(move |(row, values)| (unravel(row, leading), values))
    }
}

/// Convert a flat row-major offset into a multi-index.
pub(crate) fn unravel(mut offset: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, dim) in index.iter_mut().zip(shape).rev() {
        if *dim > 0 {
            *slot = offset % dim;
            offset /= dim;
        }
    }
    index
}

/// A tensor addressed by state names, built for one node.
///
/// Probability matrices start at zero. Utility matrices start at negative
/// infinity so that unset entries are rejected when the matrix is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMatrix {
    node: String,
    kind: NodeKind,
    axes: Vec<(String, Vec<String>)>,
    tensor: Tensor,
}

impl StateMatrix {
    pub(crate) fn new(
        node: String,
        kind: NodeKind,
        axes: Vec<(String, Vec<String>)>,
        fill: f64,
    ) -> Self {
        let shape = axes.iter().map(|(_, states)| states.len()).collect();
        Self {
            node,
            kind,
            axes,
            tensor: Tensor::filled(shape, fill),
        }
    }

    /// Name of the node this matrix was built for.
    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn shape(&self) -> &[usize] {
        self.tensor.shape()
    }

    /// Names of the nodes along each axis.
    pub fn axis_nodes(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|(name, _)| name.as_str())
    }

    fn resolve<R: Into<StateRef> + Clone>(&self, states: &[R]) -> Result<Vec<usize>, DiagramError> {
        states
            .iter()
            .enumerate()
            .map(|(axis, state)| {
                let Some((name, names)) = self.axes.get(axis) else {
                    return Err(DiagramError::IndexOutOfRange {
                        index: vec![axis],
                        shape: self.shape().to_vec(),
                    });
                };
                match state.clone().into() {
                    StateRef::Index(j) if j < names.len() => Ok(j),
                    StateRef::Index(j) => Err(DiagramError::UnknownState {
                        node: name.clone(),
                        state: format!("#{j}"),
                    }),
                    StateRef::Name(s) => {
                        names
                            .iter()
                            .position(|n| *n == s)
                            .ok_or_else(|| DiagramError::UnknownState {
                                node: name.clone(),
                                state: s,
                            })
                    }
                }
            })
            .collect()
    }

    /// Set one entry addressed by a full list of states.
    pub fn set<R: Into<StateRef> + Clone>(&mut self, states: &[R], value: f64) -> Result<(), DiagramError> {
        let index = self.resolve(states)?;
        self.tensor.set(&index, value)
    }

    pub fn get<R: Into<StateRef> + Clone>(&self, states: &[R]) -> Result<f64, DiagramError> {
        let index = self.resolve(states)?;
        self.tensor.get(&index)
    }

    /// Set the row along the last axis addressed by the leading states.
    pub fn set_row<R: Into<StateRef> + Clone>(&mut self, leading: &[R], values: &[f64]) -> Result<(), DiagramError> {
        let Some(width) = self.shape().last().copied() else {
            return Err(DiagramError::InvalidOption(format!(
                "{} has a scalar table; use set with an empty state list",
                self.node
            )));
        };
        if leading.len() + 1 != self.shape().len() {
            return Err(DiagramError::IndexOutOfRange {
                index: vec![leading.len()],
                shape: self.shape().to_vec(),
            });
        }
        if values.len() != width {
            return Err(DiagramError::DimensionMismatch {
                node: self.node.clone(),
                expected: vec![width],
                actual: vec![values.len()],
            });
        }
        let mut index = self.resolve(leading)?;
        index.push(0);
        let start = self.tensor.offset(&index)?;
        self.tensor.data[start..start + width].copy_from_slice(values);
        Ok(())
    }

    /// Set one entry by raw 0-based indices.
    pub fn set_index(&mut self, index: &[usize], value: f64) -> Result<(), DiagramError> {
        self.tensor.set(index, value)
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn into_tensor(self) -> Tensor {
        self.tensor
    }
}

/// Tensor input for `set_probabilities` and `set_utility`.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorSource {
    /// A raw tensor; only its shape is checked against the node.
    Raw(Tensor),
    /// A matrix built for a named node; the name must match.
    Matrix(StateMatrix),
}

impl From<Tensor> for TensorSource {
    fn from(value: Tensor) -> Self {
        TensorSource::Raw(value)
    }
}

impl From<StateMatrix> for TensorSource {
    fn from(value: StateMatrix) -> Self {
        TensorSource::Matrix(value)
    }
}
