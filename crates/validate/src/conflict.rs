use crate::error::ValidationError;
use crate::value::ValueId;
use std::ops::Range;

/// Drop overlapping diagnostics of lesser rank. Hosts map each value node to
/// its text range; diagnostics whose ranges intersect form a group, and only
/// those at the group's minimum priority rank survive. Diagnostics without a
/// known range pass through untouched.
pub fn resolve_conflicts(
    errors: Vec<ValidationError>,
    range_of: impl Fn(ValueId) -> Option<Range<usize>>,
) -> Vec<ValidationError> {
    let mut located: Vec<(Range<usize>, ValidationError)> = Vec::new();
    let mut keep: Vec<ValidationError> = Vec::new();

    for error in errors {
        match range_of(error.value) {
            Some(range) => located.push((range, error)),
            None => keep.push(error),
        }
    }
    located.sort_by_key(|(range, _)| (range.start, range.end));

    let mut index = 0;
    while index < located.len() {
        let mut end = located[index].0.end;
        let mut next = index + 1;
        while next < located.len() && located[next].0.start < end {
            end = end.max(located[next].0.end);
            next += 1;
        }
        let group = &located[index..next];
        if let Some(best) = group.iter().map(|(_, e)| e.priority).min() {
            keep.extend(
                group
                    .iter()
                    .filter(|(_, e)| e.priority == best)
                    .map(|(_, e)| e.clone()),
            );
        }
        index = next;
    }
    keep
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::{IssueData, Priority};
    use pretty_assertions::assert_eq;

    fn error(id: usize, message: &str, priority: Priority) -> ValidationError {
        ValidationError::new(ValueId(id), message, IssueData::None, priority)
    }

    #[test]
    fn overlapping_ranges_keep_the_decisive_rank() {
        // Node 1 spans 0..10 (a container), node 2 sits at 2..5 inside it,
        // node 3 is disjoint at 20..25.
        let ranges = |id: ValueId| match id.0 {
            1 => Some(0..10),
            2 => Some(2..5),
            3 => Some(20..25),
            _ => None,
        };
        let kept = resolve_conflicts(
            vec![
                error(1, "container", Priority::Low),
                error(2, "inner", Priority::TypeMismatch),
                error(3, "elsewhere", Priority::Low),
                error(4, "unlocated", Priority::Low),
            ],
            ranges,
        );

        let messages: Vec<&str> = kept.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(vec!["unlocated", "inner", "elsewhere"], messages);
    }

    #[test]
    fn equal_rank_neighbors_all_survive() {
        let ranges = |id: ValueId| Some(id.0..id.0 + 5);
        let kept = resolve_conflicts(
            vec![
                error(0, "a", Priority::Low),
                error(3, "b", Priority::Low),
            ],
            ranges,
        );
        assert_eq!(2, kept.len());
    }
}
