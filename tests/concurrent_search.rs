use std::sync::Arc;
use std::thread;

use wikidump_search::{
    CursorTier, InMemoryCursorStore, InMemoryDump, PageCriteria, SearchConfig, SearchCriteria,
    SearchOutcome, WikiDumpSearcher,
};

fn numbered_dump(count: usize) -> String {
    let records: Vec<String> = (1..=count)
        .map(|n| {
            format!(r#"{{"id":"Q{n}","type":"item","labels":{{"en":{{"value":"label {n}"}}}}}}"#)
        })
        .collect();
    format!("[{}]", records.join(","))
}

fn searcher(dump: &str) -> WikiDumpSearcher {
    let opener = Arc::new(InMemoryDump::new("numbered", dump.as_bytes()));
    WikiDumpSearcher::with_opener(SearchConfig::default(), opener).unwrap()
}

fn race(searcher: &WikiDumpSearcher, criteria: &SearchCriteria, page: &PageCriteria) -> [SearchOutcome; 2] {
    thread::scope(|scope| {
        let left = scope.spawn(|| searcher.search_with_stats(criteria, page).unwrap());
        let right = scope.spawn(|| searcher.search_with_stats(criteria, page).unwrap());
        [left.join().unwrap(), right.join().unwrap()]
    })
}

#[test]
fn searcher_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WikiDumpSearcher>();
}

#[test]
fn same_key_searches_never_share_a_live_cursor() {
    let dump = numbered_dump(30);
    let searcher = searcher(&dump);
    let criteria = SearchCriteria::any();
    let first = PageCriteria::new(0, 5).unwrap();
    let second = first.next().unwrap();

    searcher.search(&criteria, &first).unwrap();
    let [left, right] = race(&searcher, &criteria, &second);

    assert_eq!(left.entities, right.entities);
    let ids: Vec<&str> = left.entities.iter().map(|entity| entity.id.as_str()).collect();
    assert_eq!(ids, vec!["Q6", "Q7", "Q8", "Q9", "Q10"]);
    let live = [left.stats.tier, right.stats.tier]
        .iter()
        .filter(|tier| **tier == CursorTier::Live)
        .count();
    assert_eq!(live, 1);
}

#[test]
fn concurrent_searches_with_a_shared_store_agree() {
    let dump = numbered_dump(30);
    let store = Arc::new(InMemoryCursorStore::new());
    let searcher = searcher(&dump).with_cursor_store(store);
    let criteria = SearchCriteria::builder().label_contains("1").build();
    let first = PageCriteria::new(0, 3).unwrap();
    let second = first.next().unwrap();

    searcher.search(&criteria, &first).unwrap();
    let [left, right] = race(&searcher, &criteria, &second);

    assert_eq!(left.entities, right.entities);
    let ids: Vec<&str> = left.entities.iter().map(|entity| entity.id.as_str()).collect();
    assert_eq!(ids, vec!["Q12", "Q13", "Q14"]);
    let tiers = [left.stats.tier, right.stats.tier];
    assert_eq!(tiers.iter().filter(|tier| **tier == CursorTier::Live).count(), 1);
    // The loser resumes from the persisted count instead of scanning cold.
    assert!(tiers.contains(&CursorTier::Persisted));
}
