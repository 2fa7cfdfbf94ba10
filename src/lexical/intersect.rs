//! Multi-way intersection of posting lists.
//!
//! Each query token contributes one check array. Arrays are processed
//! shortest first; an id survives a round when it also appears in that
//! round's array, and ids surviving every round form the result. With
//! suggestions enabled, ids that dropped out are kept grouped by how many
//! rounds they survived and backfill the result best first.

use std::borrow::Cow;

use ahash::AHashMap;

use crate::data::DocId;

/// Intersect check arrays.
///
/// A `limit` of 0 means unlimited. The arrays may borrow directly from the
/// index; they are never modified.
pub fn intersect(mut arrays: Vec<Cow<'_, [DocId]>>, limit: usize, suggest: bool) -> Vec<DocId> {
    let reached = |count: usize| limit != 0 && count >= limit;

    match arrays.len() {
        0 => return Vec::new(),
        1 => {
            let only = &arrays[0];
            let end = if limit == 0 {
                only.len()
            } else {
                only.len().min(limit)
            };
            return only[..end].to_vec();
        }
        _ => {}
    }

    arrays.sort_by_key(|array| array.len());

    let mut rounds: AHashMap<&DocId, usize> = AHashMap::with_capacity(arrays[0].len());
    for id in arrays[0].iter() {
        rounds.insert(id, 1);
    }

    let mut result = Vec::new();
    // survivors of the most recent round, grouped by rounds survived
    let mut suggestions: Vec<Vec<&DocId>> = Vec::new();
    let last = arrays.len() - 1;

    for z in 1..arrays.len() {
        let mut found = false;
        suggestions.clear();

        for id in arrays[z].iter() {
            match rounds.get_mut(id) {
                Some(count) if *count == z => {
                    *count = z + 1;
                    found = true;
                    if z == last {
                        result.push(id.clone());
                        if reached(result.len()) {
                            return result;
                        }
                    }
                }
                Some(count) if suggest && *count < z => {
                    if suggestions.len() <= *count {
                        suggestions.resize_with(*count + 1, Vec::new);
                    }
                    suggestions[*count].push(id);
                }
                _ => {}
            }
        }

        if !found && !suggest {
            break;
        }
    }

    if suggest {
        for group in suggestions.iter().rev() {
            for id in group {
                if reached(result.len()) {
                    return result;
                }
                result.push((*id).clone());
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[i64]) -> Vec<DocId> {
        values.iter().map(|&v| DocId::Int(v)).collect()
    }

    fn arrays(lists: &[Vec<DocId>]) -> Vec<Cow<'_, [DocId]>> {
        lists.iter().map(|l| Cow::Borrowed(l.as_slice())).collect()
    }

    #[test]
    fn test_two_way_intersection() {
        let lists = [ids(&[1, 2, 3, 5]), ids(&[2, 3, 5, 8])];
        let mut result = intersect(arrays(&lists), 0, false);
        result.sort();
        assert_eq!(result, ids(&[2, 3, 5]));
    }

    #[test]
    fn test_limit_stops_early() {
        let lists = [ids(&[1, 2, 3, 5]), ids(&[2, 3, 5, 8])];
        let result = intersect(arrays(&lists), 2, false);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|id| ids(&[2, 3, 5]).contains(id)));
    }

    #[test]
    fn test_shortest_array_first() {
        // the single-element array seeds the counting map
        let lists = [ids(&[4, 3, 2, 1]), ids(&[3]), ids(&[1, 3])];
        assert_eq!(intersect(arrays(&lists), 0, false), ids(&[3]));
    }

    #[test]
    fn test_empty_round_without_suggest() {
        let lists = [ids(&[1, 2]), ids(&[3, 4]), ids(&[1, 2, 3])];
        assert!(intersect(arrays(&lists), 0, false).is_empty());
    }

    #[test]
    fn test_suggestions_backfill_best_first() {
        // 1 and 2 match every array, 3 misses the middle one
        let lists = [ids(&[1, 2, 3]), ids(&[1, 2, 9, 10]), ids(&[3, 2, 1, 11, 12])];
        let result = intersect(arrays(&lists), 0, true);
        assert_eq!(result, ids(&[2, 1, 3]));
        assert!(!result.contains(&DocId::Int(9)));

        let result = intersect(arrays(&lists), 0, false);
        assert_eq!(result, ids(&[2, 1]));
    }

    #[test]
    fn test_suggestions_respect_limit() {
        let lists = [ids(&[1, 2]), ids(&[1, 3]), ids(&[2, 4, 5])];
        let result = intersect(arrays(&lists), 1, true);
        assert_eq!(result, ids(&[2]));

        let result = intersect(arrays(&lists), 0, true);
        assert_eq!(result, ids(&[2]));
    }

    #[test]
    fn test_single_array_truncated() {
        let lists = [ids(&[7, 8, 9])];
        assert_eq!(intersect(arrays(&lists), 2, false), ids(&[7, 8]));
        assert_eq!(intersect(arrays(&lists), 0, false), ids(&[7, 8, 9]));
        assert!(intersect(Vec::new(), 10, true).is_empty());
    }
}
