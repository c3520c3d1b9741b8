#![no_main]

use arbitrary::Arbitrary;
use himono::repo::Repository;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Op {
    label: Vec<u8>,
    data: Vec<u8>,
    query: Vec<u8>,
}

fuzz_target!(|ops: Vec<Op>| {
    // Any sequence of puts and queries must leave the suffix array sorted
    // and must not panic, and the indexed and brute-force modes must
    // always agree on the set of occurrences for every query issued.
    let mut indexed = Repository::new();
    let mut fallback = Repository::new_without_index();
    for op in ops.iter().take(64) {
        indexed.add(&op.label, &op.data).unwrap();
        fallback.add(&op.label, &op.data).unwrap();

        let mut a: Vec<(usize, u32)> = indexed
            .query(&op.query)
            .iter()
            .map(|o| (o.doc_index, o.offset))
            .collect();
        let mut b: Vec<(usize, u32)> = fallback
            .query(&op.query)
            .iter()
            .map(|o| (o.doc_index, o.offset))
            .collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }
});
