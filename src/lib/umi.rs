//! UMI extraction and directional clustering.
//!
//! The UMI of a read is the last `umi_length` characters of its original name (before any
//! proxy suffix). UMIs observed at one genomic position are clustered with the directional
//! method: a UMI `a` absorbs a UMI `b` when they differ at no more than `max_mismatches`
//! positions and `count(a) >= 2 * count(b) - 1`. Clusters are grown breadth-first from the
//! most abundant unassigned UMI, which becomes the cluster's representative.

use std::collections::VecDeque;

/// Counts mismatching positions; `usize::MAX` when the lengths differ.
///
/// ```
/// use minute_lib::umi::count_mismatches;
///
/// assert_eq!(count_mismatches(b"ACGT", b"ACTT"), 1);
/// assert_eq!(count_mismatches(b"ACG", b"ACGT"), usize::MAX);
/// ```
#[must_use]
pub fn count_mismatches(a: &[u8], b: &[u8]) -> usize {
    if a.len() != b.len() {
        return usize::MAX;
    }
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

/// Whether two UMIs have equal length and at most `max_mismatches` differences.
#[must_use]
pub fn matches_within_threshold(a: &[u8], b: &[u8], max_mismatches: usize) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut mismatches = 0;
    for (x, y) in a.iter().zip(b) {
        if x != y {
            mismatches += 1;
            if mismatches > max_mismatches {
                return false;
            }
        }
    }
    true
}

/// The last `umi_length` bytes of `name`, or all of it when the name is shorter.
#[must_use]
pub fn umi_from_name(name: &[u8], umi_length: usize) -> &[u8] {
    &name[name.len().saturating_sub(umi_length)..]
}

/// Indices (into the clustered slice) of one UMI cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UmiCluster {
    /// Index of the most abundant UMI of the cluster.
    pub representative: usize,
    /// All member indices, representative first.
    pub members: Vec<usize>,
}

/// Clusters `(umi, count)` pairs with the directional method.
///
/// Every input index belongs to exactly one cluster. Ties in count are broken by UMI so
/// that results do not depend on input order.
///
/// ```
/// use minute_lib::umi::directional_clusters;
///
/// let umis = [(b"AAAA".as_slice(), 10), (b"AAAT".as_slice(), 2), (b"GGGG".as_slice(), 3)];
/// let clusters = directional_clusters(&umis, 1);
/// assert_eq!(clusters.len(), 2);
/// assert_eq!(clusters[0].members, vec![0, 1]);
/// ```
#[must_use]
pub fn directional_clusters<U: AsRef<[u8]>>(
    umi_counts: &[(U, u64)],
    max_mismatches: u32,
) -> Vec<UmiCluster> {
    let mut order: Vec<usize> = (0..umi_counts.len()).collect();
    order.sort_by(|&a, &b| {
        umi_counts[b].1.cmp(&umi_counts[a].1).then_with(|| {
            umi_counts[a].0.as_ref().cmp(umi_counts[b].0.as_ref())
        })
    });

    let max_mismatches = max_mismatches as usize;
    let mut assigned = vec![false; umi_counts.len()];
    let mut clusters = Vec::new();
    let mut queue = VecDeque::new();

    for &root in &order {
        if assigned[root] {
            continue;
        }
        assigned[root] = true;
        let mut members = vec![root];
        queue.push_back(root);

        while let Some(parent) = queue.pop_front() {
            let (parent_umi, parent_count) =
                (umi_counts[parent].0.as_ref(), umi_counts[parent].1);
            for &child in &order {
                if assigned[child] {
                    continue;
                }
                let child_count = umi_counts[child].1;
                if parent_count + 1 >= 2 * child_count
                    && matches_within_threshold(
                        parent_umi,
                        umi_counts[child].0.as_ref(),
                        max_mismatches,
                    )
                {
                    assigned[child] = true;
                    members.push(child);
                    queue.push_back(child);
                }
            }
        }

        clusters.push(UmiCluster { representative: root, members });
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn clusters_of(umis: &[(&str, u64)], max_mismatches: u32) -> Vec<Vec<String>> {
        let input: Vec<(&[u8], u64)> = umis.iter().map(|(u, c)| (u.as_bytes(), *c)).collect();
        directional_clusters(&input, max_mismatches)
            .into_iter()
            .map(|c| c.members.into_iter().map(|i| umis[i].0.to_string()).collect())
            .collect()
    }

    #[rstest]
    #[case("ACGT", "ACGT", 0)]
    #[case("ACGT", "ACGA", 1)]
    #[case("AAAA", "TTTT", 4)]
    fn test_count_mismatches(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(count_mismatches(a.as_bytes(), b.as_bytes()), expected);
    }

    #[test]
    fn test_matches_within_threshold() {
        assert!(matches_within_threshold(b"ACGT", b"ACGT", 0));
        assert!(matches_within_threshold(b"ACGT", b"ACTT", 1));
        assert!(!matches_within_threshold(b"ACGT", b"AATT", 1));
        assert!(!matches_within_threshold(b"ACG", b"ACGT", 3));
    }

    #[test]
    fn test_umi_from_name() {
        assert_eq!(umi_from_name(b"read1_ACGTAC", 6), b"ACGTAC");
        assert_eq!(umi_from_name(b"AC", 6), b"AC");
        assert_eq!(umi_from_name(b"read1", 0), b"");
    }

    #[test]
    fn test_abundant_umi_absorbs_neighbour() {
        // 5 >= 2*3-1, so AAAT joins AAAA
        assert_eq!(clusters_of(&[("AAAA", 5), ("AAAT", 3)], 1), vec![vec!["AAAA", "AAAT"]]);
    }

    #[test]
    fn test_similar_counts_stay_separate() {
        // 5 < 2*4-1
        assert_eq!(
            clusters_of(&[("AAAA", 5), ("AAAT", 4)], 1),
            vec![vec!["AAAA"], vec!["AAAT"]]
        );
    }

    #[test]
    fn test_chained_absorption() {
        // AAAA -> AAAT -> AATT, even though AAAA and AATT differ at two positions
        assert_eq!(
            clusters_of(&[("AATT", 1), ("AAAA", 10), ("AAAT", 4)], 1),
            vec![vec!["AAAA", "AAAT", "AATT"]]
        );
    }

    #[test]
    fn test_zero_mismatches_is_identity() {
        assert_eq!(
            clusters_of(&[("AAAA", 10), ("AAAT", 1)], 0),
            vec![vec!["AAAA"], vec!["AAAT"]]
        );
    }

    #[test]
    fn test_ties_broken_by_umi() {
        let clusters = clusters_of(&[("TTTT", 2), ("AAAA", 2)], 1);
        assert_eq!(clusters, vec![vec!["AAAA"], vec!["TTTT"]]);
    }

    #[test]
    fn test_empty() {
        let input: Vec<(&[u8], u64)> = Vec::new();
        assert!(directional_clusters(&input, 1).is_empty());
    }
}
