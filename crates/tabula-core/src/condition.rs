// crates/tabula-core/src/condition.rs
// ============================================================================
// Module: Condition Tree
// Description: Composable filter predicates over field descriptors.
// Purpose: Lower predicate trees to parameterized text with unique tokens.
// Dependencies: crate::{error, field, value}
// ============================================================================

//! ## Overview
//! A [`Condition`] is either a comparison leaf (field, operator, literal) or a
//! boolean combination of two conditions. Lowering walks the tree and returns
//! predicate text plus the named parameters it binds.
//!
//! Every leaf draws its parameter token from a [`ParamAllocator`]. Tokens are
//! unique for the allocator's lifetime, so two leaves on the same field never
//! share a parameter and a merged mapping never loses an entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::ops::BitAnd;
use std::ops::BitOr;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::error::OrmError;
use crate::error::OrmResult;
use crate::field::FieldDescriptor;
use crate::value::Params;
use crate::value::Value;

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Comparison operator of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl ComparisonOp {
    /// Returns the SQL operator text.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

// ============================================================================
// SECTION: Parameter Tokens
// ============================================================================

/// Monotonic allocator of parameter tokens.
///
/// Allocation is a single atomic increment, so conditions may be lowered
/// concurrently against one allocator.
#[derive(Debug, Default)]
pub struct ParamAllocator {
    /// Next token number.
    next: AtomicU64,
}

impl ParamAllocator {
    /// Creates an allocator starting at `p0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
        }
    }

    /// Allocates a fresh token.
    pub fn next_token(&self) -> String {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        format!("p{value}")
    }
}

// ============================================================================
// SECTION: Lowered Predicate
// ============================================================================

/// Predicate text plus the named parameters it references.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredPredicate {
    /// Predicate text, e.g. `duration = :p0`.
    pub text: String,
    /// Parameters keyed by token.
    pub params: Params,
}

impl LoweredPredicate {
    /// Always-true predicate with no parameters.
    #[must_use]
    pub fn always() -> Self {
        Self {
            text: "1=1".to_string(),
            params: Params::new(),
        }
    }
}

// ============================================================================
// SECTION: Condition Tree
// ============================================================================

/// Filter predicate tree.
///
/// Each subtree lowers to its own parenthesized text, so composition order
/// alone decides grouping.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field op literal`
    Comparison {
        /// Comparison operator.
        op: ComparisonOp,
        /// Column reference.
        field: FieldDescriptor,
        /// Literal compared against the column.
        value: Value,
    },
    /// Both sides must hold.
    And(Box<Self>, Box<Self>),
    /// At least one side must hold.
    Or(Box<Self>, Box<Self>),
}

impl Condition {
    /// Builds a comparison leaf.
    #[must_use]
    pub fn comparison(op: ComparisonOp, field: FieldDescriptor, value: impl Into<Value>) -> Self {
        Self::Comparison {
            op,
            field,
            value: value.into(),
        }
    }

    /// Combines with `other` using `AND`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Combines with `other` using `OR`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Number of comparison leaves in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Comparison {
                ..
            } => 1,
            Self::And(left, right) | Self::Or(left, right) => {
                left.leaf_count() + right.leaf_count()
            }
        }
    }

    /// Lowers the tree to predicate text and parameters.
    ///
    /// # Errors
    ///
    /// Returns a field lowering error when a literal cannot be bound (e.g. an
    /// unsaved referenced record) and [`OrmError::ParameterCollision`] when two
    /// leaves received the same token.
    pub fn lower(&self, allocator: &ParamAllocator) -> OrmResult<LoweredPredicate> {
        match self {
            Self::Comparison {
                op,
                field,
                value,
            } => {
                let bound = field.to_sql(value)?;
                let token = allocator.next_token();
                let text = format!("{} {op} :{token}", field.name());
                let mut params = Params::new();
                params.insert(token, bound);
                Ok(LoweredPredicate {
                    text,
                    params,
                })
            }
            Self::And(left, right) => lower_pair("AND", left, right, allocator),
            Self::Or(left, right) => lower_pair("OR", left, right, allocator),
        }
    }
}

/// Lowers both sides of a boolean node and merges their parameters.
fn lower_pair(
    keyword: &str,
    left: &Condition,
    right: &Condition,
    allocator: &ParamAllocator,
) -> OrmResult<LoweredPredicate> {
    let left = left.lower(allocator)?;
    let right = right.lower(allocator)?;
    let mut params = left.params;
    for (token, value) in right.params {
        if params.contains_key(&token) {
            return Err(OrmError::ParameterCollision {
                token,
            });
        }
        params.insert(token, value);
    }
    Ok(LoweredPredicate {
        text: format!("({}) {keyword} ({})", left.text, right.text),
        params,
    })
}

impl BitOr for Condition {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

impl BitAnd for Condition {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}
