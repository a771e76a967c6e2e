//! Fuzz target for the remapping engine.
//!
//! Any document that parses is merged with itself, validated and split.
//! Broken references must surface as errors, never as panics.
//!
//! Run with:
//!   cargo +nightly fuzz run merge_split

#![no_main]

use libfuzzer_sys::fuzz_target;
use cocomerge::ir::io_coco_json::from_coco_slice;
use cocomerge::merge::{merge_datasets, MergeOptions, MergeSource};
use cocomerge::split::{split_dataset, SplitOptions};
use cocomerge::validation::{validate_dataset, IssueCode, ValidateOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(dataset) = from_coco_slice(data) else {
        return;
    };

    let _ = validate_dataset(&dataset, &ValidateOptions::default());

    let sources = [
        MergeSource::new("a", dataset.clone()),
        MergeSource::new("b", dataset.clone()),
    ];
    if let Ok(out) = merge_datasets(&sources, &MergeOptions::default()) {
        let report = validate_dataset(
            &out.dataset,
            &ValidateOptions {
                strict: false,
                require_contiguous_ids: true,
            },
        );
        assert!(
            !report.has(IssueCode::NonContiguousIds),
            "merged output must be renumbered from 0"
        );
    }

    let _ = split_dataset(&dataset, &SplitOptions::default());
});
