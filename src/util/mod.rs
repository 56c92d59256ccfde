use std::{
    collections::HashSet,
    hash::{DefaultHasher, Hash, Hasher},
    ops::Range,
    sync::Mutex,
};

pub mod i18n;
pub mod math;

/// Conversion between the "em" units of the style spec and the points
/// used internally for layout.
pub const ONE_EM: f64 = 24.0;

pub fn hash_combine<T: Hash>(seed: &mut u64, v: &T) {
    let mut hasher = DefaultHasher::new();
    v.hash(&mut hasher);
    *seed ^= hasher
        .finish()
        .overflowing_add(0x9e3779b9)
        .0
        .overflowing_add(*seed << 6)
        .0
        .overflowing_add(*seed >> 2)
        .0;
}

pub fn hash<T: Hash>(args: &[T]) -> u64 {
    let mut seed = 0;
    for arg in args {
        hash_combine(&mut seed, arg);
    }
    seed
}

/// First index in sorted `v` whose element is not less than `elt`.
pub fn lower_bound<T: PartialOrd>(v: &[T], elt: &T) -> usize {
    let mut range = 0..v.len();
    while !range.is_empty() {
        let (a, b) = split_in_half(&range);
        if v[b.start] < *elt {
            range = b.start + 1..b.end;
        } else {
            range = a;
        }
    }
    range.start
}

fn split_in_half(range: &Range<usize>) -> (Range<usize>, Range<usize>) {
    let mid = (range.end - range.start) / 2 + range.start;
    (range.start..mid, mid..range.end)
}

static SEEN_WARNINGS: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Log a warning at most once per distinct message. Per-feature
/// conditions (glyph budget, image section budget) would otherwise spam
/// the log once per tile parse.
pub fn warn_once(message: &str) {
    let mut guard = SEEN_WARNINGS.lock().expect("warning set poisoned");
    let seen = guard.get_or_insert_with(HashSet::new);
    if seen.insert(message.to_string()) {
        log::warn!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::lower_bound;

    #[test]
    fn lower_bound_sorted() {
        let mut input = [10, 20, 30, 30, 20, 10, 10, 20];
        input.sort();

        assert_eq!(lower_bound(&input, &20), 3);
        assert_eq!(lower_bound(&input, &15), 3);
        assert_eq!(lower_bound(&input, &5), 0);
        assert_eq!(lower_bound(&input, &31), 8);
    }
}
