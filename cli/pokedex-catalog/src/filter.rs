use crate::aggregator::AggregateState;
use crate::types::ItemDetail;

/// Project the details of `state` that match `query`, in index order.
///
/// Items whose detail has not arrived yet are skipped.
/// A non-empty query keeps entries whose key contains it, ignoring case.
pub fn filter<'a>(state: &'a AggregateState, query: &str) -> Vec<&'a ItemDetail> {
    let query = query.to_lowercase();
    state
        .items
        .iter()
        .filter(|item| query.is_empty() || item.key.to_lowercase().contains(&query))
        .filter_map(|item| state.details.get(&item.key))
        .collect()
}
