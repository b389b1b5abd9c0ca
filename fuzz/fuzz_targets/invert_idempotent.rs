//! Fuzz test for inversion idempotency: invert(invert(x)) == x
//!
//! Any input the reader accepts is inverted twice; the result must be
//! identical to re-encoding the input once, and both inversions must
//! keep the entry count.

use geodiff_changeset::testing::reencode;
use geodiff_changeset::{ChangesetReader, changes_count, invert_changeset_bytes};
use honggfuzz::fuzz;

fn main() {
    loop {
        fuzz!(|data: &[u8]| {
            let Ok(canonical) = reencode(data) else {
                return;
            };

            let inverted = invert_changeset_bytes(&canonical).expect("canonical input must invert");
            let double_inverted =
                invert_changeset_bytes(&inverted).expect("inverted changeset must invert");

            assert_eq!(
                canonical, double_inverted,
                "Binary representation should be identical after double inversion"
            );

            let count = |bytes: &[u8]| {
                changes_count(&mut ChangesetReader::new(bytes).expect("must open"))
                    .expect("must parse")
            };
            assert_eq!(count(&canonical), count(&inverted));
        });
    }
}
