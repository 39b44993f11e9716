//! Property-based tests for window ownership
//!
//! Any covering, non-overlapping set of windows must emit every revision
//! exactly once, and a window's output for a page must not depend on where
//! the window ends as long as the page start stays inside it.

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::io::Cursor;
use wikisplit::reader::BoundaryReader;
use wikisplit::scanner::RevisionScanner;

/// Revision counts per page
fn corpus_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..4, 1..6)
}

/// Text bodies, including ones that look like tags
fn body_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-zA-Z0-9 ]{1,40}",
        Just("&lt;page&gt; is escaped".to_string()),
        Just("{{stub}}".to_string()),
    ]
}

fn build_dump(pages: &[usize], body: &str) -> (String, BTreeSet<String>) {
    let mut xml = String::from("<mediawiki>\n  <siteinfo>\n    <sitename>Wikipedia</sitename>\n  </siteinfo>\n");
    let mut keys = BTreeSet::new();
    for (p, &revisions) in pages.iter().enumerate() {
        let page_id = p + 1;
        xml.push_str(&format!(
            "  <page>\n    <title>Page {page_id}</title>\n    <ns>0</ns>\n    <id>{page_id}</id>\n"
        ));
        for r in 0..revisions {
            let revision_id = page_id * 100 + r;
            xml.push_str(&format!(
                "    <revision>\n      <id>{revision_id}</id>\n      <timestamp>2002-02-25T15:43:11Z</timestamp>\n      <text bytes=\"{}\">{body}</text>\n    </revision>\n",
                body.len()
            ));
            keys.insert(format!("{page_id}_{revision_id}"));
        }
        xml.push_str("  </page>\n");
    }
    xml.push_str("</mediawiki>\n");
    (xml, keys)
}

fn scan_window(data: &[u8], start: usize, end: usize) -> Vec<String> {
    let reader = BoundaryReader::new(Cursor::new(&data[start..]), start as u64, Some(end as u64));
    RevisionScanner::new(reader, "dump.xml")
        .map(|r| r.unwrap().key)
        .collect()
}

/// Window boundaries from sorted, deduplicated cut points
fn windows(len: usize, cuts: &[usize]) -> Vec<(usize, usize)> {
    let mut points: Vec<usize> = cuts.iter().map(|c| c % (len + 1)).collect();
    points.push(0);
    points.push(len);
    points.sort_unstable();
    points.dedup();
    points.windows(2).map(|w| (w[0], w[1])).collect()
}

proptest! {
    #[test]
    fn windows_partition_revisions(
        pages in corpus_strategy(),
        body in body_strategy(),
        cuts in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let (xml, expected) = build_dump(&pages, &body);
        let data = xml.as_bytes();

        let mut seen = Vec::new();
        for (start, end) in windows(data.len(), &cuts) {
            seen.extend(scan_window(data, start, end));
        }

        let unique: BTreeSet<String> = seen.iter().cloned().collect();
        prop_assert_eq!(unique.len(), seen.len(), "duplicate revisions: {:?}", seen);
        prop_assert_eq!(unique, expected);
    }

    #[test]
    fn window_length_does_not_change_owned_page(
        pages in corpus_strategy(),
        page_pick in any::<prop::sample::Index>(),
        slack_before in 0usize..40,
        extra_a in 1usize..2000,
        extra_b in 1usize..2000,
    ) {
        let (xml, _) = build_dump(&pages, "body");
        let data = xml.as_bytes();

        let starts: Vec<usize> = xml.match_indices("<page>").map(|(i, _)| i).collect();
        let page_start = starts[page_pick.index(starts.len())];
        let window_start = page_start.saturating_sub(slack_before);
        // the window must not reach the next page start
        let limit = starts
            .iter()
            .find(|&&s| s > page_start)
            .copied()
            .unwrap_or(data.len());

        let end_a = (page_start + extra_a).min(limit).max(page_start + 1);
        let end_b = (page_start + extra_b).min(limit).max(page_start + 1);

        let keys_a = scan_window(data, window_start, end_a);
        let keys_b = scan_window(data, window_start, end_b);
        prop_assert!(!keys_a.is_empty());
        prop_assert_eq!(keys_a, keys_b);
    }

    #[test]
    fn window_cutting_page_tag_emits_nothing(
        pages in corpus_strategy(),
        page_pick in any::<prop::sample::Index>(),
        offset in 1usize..6,
    ) {
        let (xml, _) = build_dump(&pages, "");
        let data = xml.as_bytes();

        let starts: Vec<usize> = xml.match_indices("<page>").map(|(i, _)| i).collect();
        let page_start = starts[page_pick.index(starts.len())];
        // a window holding only the tail of the tag, ending before the next line
        let start = page_start + offset;
        prop_assert!(scan_window(data, start, start + 6 - offset).is_empty());
    }
}
