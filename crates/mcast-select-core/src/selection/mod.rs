//! Bulk device selection: the selection model and the controller driving it.

pub mod controller;
pub mod set;

pub use controller::{
    LoadedPage, LookupOutcome, Membership, PageBatch, PageRefresh, RowState, SelectAllState,
    SelectionController, Submission,
};
pub use set::{SelectionMode, SelectionSet};
