/// Sorting engine module
///
/// This module owns the non-trivial logic of the application:
/// - The fixed grouping criteria library (criteria.rs)
/// - Hierarchical sort plan generation (planner.rs)
/// - Letter-pile consolidation / bin packing (letters.rs)
/// - Progressive, cancellable tree materialization (populate.rs)

pub mod criteria;
pub mod letters;
pub mod planner;
pub mod populate;

use thiserror::Error;

use criteria::Criterion;

/// Validation failures raised by plan generation.
///
/// These abort only the offending call; degenerate inputs (empty
/// card lists, empty criteria) are not errors and resolve to empty
/// plans instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("unknown sort criterion: {0}")]
    UnknownCriterion(String),
    #[error("sort order contains duplicate criteria: {0}")]
    DuplicateCriterion(Criterion),
}
