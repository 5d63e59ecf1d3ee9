use smallvec::SmallVec;

/// Deepest name the enumerator expands in full. Real DNS names essentially
/// never exceed 16 labels; deeper inputs contribute their first 16 suffixes.
pub const MAX_SUFFIX_DEPTH: usize = 16;

/// All label-suffixes of a domain, longest first.
///
/// `www.a.b.com` yields `[www.a.b.com, a.b.com, b.com, com]`. Each suffix
/// is a borrowed view into the input; nothing is allocated unless the inline
/// buffer overflows (it cannot, by the depth bound). The suffix set feeds
/// the `IN (?1..?k)` wildcard queries, turning what would be a full table
/// scan into at most `MAX_SUFFIX_DEPTH` indexed point lookups.
pub fn suffixes(domain: &str) -> SmallVec<[&str; MAX_SUFFIX_DEPTH]> {
    let mut out = SmallVec::new();
    let mut rest = domain;
    while out.len() < MAX_SUFFIX_DEPTH {
        out.push(rest);
        match rest.split_once('.') {
            Some((_, tail)) if !tail.is_empty() => rest = tail,
            _ => break,
        }
    }
    out
}
