//! Reference range table and the comparator that classifies values against it.

pub mod comparator;
pub mod table;

pub use comparator::{
    classify, compare, compare_for_sex, ParameterComparison, RangeComparison, RangeStatus,
};
pub use table::{Bounds, ReferenceRange, ReferenceRangeTable, Sex};
