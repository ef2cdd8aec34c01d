use std::cmp::Ordering;

/// Compare two dotted version strings component by component.
///
/// Each component compares numerically on its leading digits, then on any
/// remaining suffix. Missing trailing components count as `0`, so `"1.0"`
/// equals `"1"`, and `"0.6.9" < "0.6.21" < "0.7.0"`.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left: Vec<&str> = left.trim().split('.').collect();
    let right: Vec<&str> = right.trim().split('.').collect();

    for i in 0..left.len().max(right.len()) {
        let a = left.get(i).copied().unwrap_or("0");
        let b = right.get(i).copied().unwrap_or("0");
        let ordering = compare_component(a, b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn compare_component(a: &str, b: &str) -> Ordering {
    let (num_a, rest_a) = split_numeric(a);
    let (num_b, rest_b) = split_numeric(b);

    match (num_a, num_b) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| rest_a.cmp(rest_b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => rest_a.cmp(rest_b),
    }
}

/// Split a component into its numeric prefix and the remaining suffix
fn split_numeric(component: &str) -> (Option<u128>, &str) {
    let digits = component
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(component.len());

    if digits == 0 {
        return (None, component);
    }

    let significant = component[..digits].trim_start_matches('0');
    let number = if significant.is_empty() {
        0
    } else {
        // Saturate absurdly long digit runs instead of failing the comparison
        significant.parse::<u128>().unwrap_or(u128::MAX)
    };

    (Some(number), &component[digits..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(compare_versions("0.6.9", "0.6.21"), Ordering::Less);
        assert_eq!(compare_versions("0.6.21", "0.7.0"), Ordering::Less);
        assert_eq!(compare_versions("0.6.9", "0.7.0"), Ordering::Less);
        assert_eq!(compare_versions("0.7.0", "0.6.21"), Ordering::Greater);
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(compare_versions("1.0", "1"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.1", "1"), Ordering::Greater);
        assert_eq!(compare_versions("0.06", "0.6"), Ordering::Equal);
    }

    #[test]
    fn test_suffixes_break_ties() {
        assert_eq!(compare_versions("1.2a", "1.2b"), Ordering::Less);
        assert_eq!(compare_versions("1.2", "1.2rc1"), Ordering::Less);
        assert_eq!(compare_versions("1.beta", "1.0"), Ordering::Less);
    }

    proptest! {
        #[test]
        fn prop_matches_tuple_ordering(a in proptest::collection::vec(0u32..1000, 1..5),
                                       b in proptest::collection::vec(0u32..1000, 1..5)) {
            let left = a.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(".");
            let right = b.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(".");

            let width = a.len().max(b.len());
            let mut pa = a.clone();
            let mut pb = b.clone();
            pa.resize(width, 0);
            pb.resize(width, 0);

            prop_assert_eq!(compare_versions(&left, &right), pa.cmp(&pb));
        }

        #[test]
        fn prop_antisymmetric(a in "[0-9]{1,3}(\\.[0-9a-z]{1,3}){0,3}", b in "[0-9]{1,3}(\\.[0-9a-z]{1,3}){0,3}") {
            prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        }
    }
}
