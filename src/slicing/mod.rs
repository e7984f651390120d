pub mod ledger;

pub use ledger::{SliceEntry, SliceLedger};
