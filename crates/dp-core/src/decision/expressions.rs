//! Path utilities that depend on other model variables.
//!
//! Some diagrams value a path by an expression over auxiliary decision
//! variables (a portfolio selection, for instance). The expressions are
//! built alongside the model; once it is solved they are evaluated and
//! turned into an ordinary path utility so the post-solve analysis can run
//! unchanged.

use std::collections::BTreeMap;

use crate::diagram::{InfluenceDiagram, PathUtility, State};
use crate::error::DiagramError;
use crate::model::{LinearExpr, Solution};
use crate::paths::{Path, Paths};

#[derive(Debug, Clone, Default)]
pub struct PathExpressions {
    exprs: BTreeMap<Path, LinearExpr>,
}

impl PathExpressions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one expression per path of the diagram.
    pub fn from_fn<F>(diagram: &InfluenceDiagram, mut f: F) -> Result<Self, DiagramError>
    where
        F: FnMut(&[State]) -> LinearExpr,
    {
        if !diagram.is_generated() {
            return Err(DiagramError::NotGenerated);
        }
        let exprs = Paths::new(diagram.states())
            .map(|path| {
                let expr = f(&path);
                (path, expr)
            })
            .collect();
        Ok(Self { exprs })
    }

    pub fn insert(&mut self, path: Path, expr: LinearExpr) {
        self.exprs.insert(path, expr);
    }

    pub fn get(&self, path: &[State]) -> Option<&LinearExpr> {
        self.exprs.get(path)
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Evaluate every expression at a solution.
    pub fn evaluate(&self, solution: &Solution) -> BTreeMap<Path, f64> {
        self.exprs
            .iter()
            .map(|(path, expr)| (path.clone(), expr.evaluate(solution.values())))
            .collect()
    }

    /// Freeze the expressions at a solution into a path utility.
    ///
    /// Paths without an expression have zero utility.
    pub fn into_path_utility(self, solution: &Solution) -> PathUtility {
        let values = self.evaluate(solution);
        PathUtility::custom(move |path| values.get(path).copied().unwrap_or(0.0))
    }
}
