use veil_core::{Affinity, HiddenRange, HiddenRanges, HiddenSource};

fn main() {
    let text = "let a = 1; // [START s]\nlet b = 2;\n";
    let comment = text.find("//").unwrap_or(0);
    let end = text.find('\n').unwrap_or(text.len());

    // Service comment, keyed by its offset, plus a fold over the second line's text.
    let ranges = HiddenRanges::new(text.chars().count())
        .copy_with_range(
            HiddenSource::ServiceComments,
            comment,
            HiddenRange::new(comment, end, 0, 0, false),
        )
        .copy_with_range(
            HiddenSource::FoldedBlocks,
            1,
            HiddenRange::new(end + 1, end + 11, 1, 1, false),
        );

    println!("visible: {:?}", ranges.cut_string(text));
    for visible in [0, 11, 12] {
        println!(
            "{visible:>2} -> downstream {}, upstream {}",
            ranges.recover_position(visible, Affinity::Downstream).unwrap_or(0),
            ranges.recover_position(visible, Affinity::Upstream).unwrap_or(0),
        );
    }

    let unfolded = ranges.copy_without_range(HiddenSource::FoldedBlocks, 1);
    println!("unfolded: {:?}", unfolded.cut_string(text));
}
