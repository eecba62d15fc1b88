//! The Skeleton Cache Engine (§4.A): discovery, raw-directory analysis,
//! BOM-tolerant atomic I/O, and the `SkeletonStore` that ties them together.

mod discovery;
mod io;
mod raw;
mod store;

pub use discovery::detect_storage_locations;
pub use io::{read_json_bom_tolerant, skeleton_path, write_json_atomic};
pub use raw::{
    analyze_raw_task_dir, is_valid_task_dir, opening_text_for_dir, reference_timestamp,
    RawAnalysis,
};
pub use store::{ScanReport, SkeletonStore};
