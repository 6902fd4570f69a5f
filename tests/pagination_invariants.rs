use std::fs;
use std::sync::Arc;

use wikidump_search::{
    Entity, EntityParser, EntityType, InMemoryDump, Language, PageCriteria, RecordDecoder,
    SearchConfig, SearchCriteria, SearchError, WikiDumpSearcher,
};

/// Dump with a mix of items, properties, unlabeled and undescribed records.
fn mixed_dump(count: usize) -> String {
    let records: Vec<String> = (0..count)
        .map(|n| {
            let (id, entity_type) = if n % 5 == 0 {
                (format!("P{n}"), "property")
            } else {
                (format!("Q{n}"), "item")
            };
            let labels = match n % 7 {
                3 => "[]".to_string(),
                _ => format!(r#"{{"en":{{"value":"name {n} {}"}}}}"#, if n % 2 == 0 { "even" } else { "odd" }),
            };
            let descriptions = if n % 3 == 0 {
                "{}".to_string()
            } else {
                format!(r#"{{"en":{{"value":"record number {n}"}}}}"#)
            };
            format!(
                r#"{{"id":"{id}","type":"{entity_type}","labels":{labels},"descriptions":{descriptions},"claims":{{"P31":[{{"mainsnak":{{"datatype":"wikibase-item","datavalue":{{"value":{{"id":"Q{n}"}}}}}}}}]}}}}"#
            )
        })
        .collect();
    format!("[\n{}\n]", records.join(",\n"))
}

fn searcher_for(dump: &str) -> WikiDumpSearcher {
    let opener = Arc::new(InMemoryDump::new("mixed", dump.as_bytes()));
    WikiDumpSearcher::with_opener(SearchConfig::default(), opener).unwrap()
}

/// One pass over the dump without pagination or caching.
fn scan(dump: &str, criteria: &SearchCriteria) -> Vec<Entity> {
    let parser = EntityParser::default();
    RecordDecoder::new(dump.as_bytes())
        .map(|raw| parser.parse(raw.unwrap(), criteria.language()).unwrap())
        .filter(|entity| criteria.matches(entity))
        .collect()
}

fn paged(searcher: &WikiDumpSearcher, criteria: &SearchCriteria, size: u64) -> Vec<Entity> {
    let mut collected = Vec::new();
    let mut page = PageCriteria::new(0, size).unwrap();
    loop {
        let entities = searcher.search(criteria, &page).unwrap();
        if entities.is_empty() {
            break;
        }
        assert!(entities.len() as u64 <= size);
        collected.extend(entities);
        page = page.next().unwrap();
    }
    collected
}

fn criteria_variants() -> Vec<SearchCriteria> {
    vec![
        SearchCriteria::any(),
        SearchCriteria::builder()
            .include_entity_type(EntityType::Item)
            .build(),
        SearchCriteria::builder()
            .exclude_entity_type(EntityType::Item)
            .label_contains("even")
            .build(),
        SearchCriteria::builder()
            .description_contains("record")
            .label_contains("name")
            .build(),
    ]
}

#[test]
fn concatenated_pages_equal_single_pass_scan() {
    let dump = mixed_dump(60);
    for criteria in criteria_variants() {
        let expected = scan(&dump, &criteria);
        assert!(!expected.is_empty());
        for size in [1, 3, 7, 100] {
            let searcher = searcher_for(&dump);
            assert_eq!(paged(&searcher, &criteria, size), expected, "page size {size}");
        }
    }
}

#[test]
fn cache_hit_and_miss_return_identical_pages() {
    let dump = mixed_dump(40);
    let criteria = SearchCriteria::builder().label_contains("odd").build();

    let warm = searcher_for(&dump);
    let mut page = PageCriteria::new(0, 4).unwrap();
    for _ in 0..4 {
        let via_cache = warm.search(&criteria, &page).unwrap();
        let cold = searcher_for(&dump).search(&criteria, &page).unwrap();
        assert_eq!(via_cache, cold);
        page = page.next().unwrap();
    }
}

#[test]
fn same_window_twice_is_idempotent() {
    let dump = mixed_dump(30);
    let searcher = searcher_for(&dump);
    let criteria = SearchCriteria::any();
    let page = PageCriteria::new(0, 5).unwrap();

    let first = searcher.search(&criteria, &page).unwrap();
    let second = searcher.search(&criteria, &page).unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

#[test]
fn out_of_order_windows_still_match_scan() {
    let dump = mixed_dump(50);
    let criteria = SearchCriteria::any();
    let expected = scan(&dump, &criteria);
    let searcher = searcher_for(&dump);

    for index in [3, 0, 2, 2, 1] {
        let page = PageCriteria::new(index, 4).unwrap();
        let start = (index * 4) as usize;
        let end = (start + 4).min(expected.len());
        assert_eq!(searcher.search(&criteria, &page).unwrap(), expected[start..end]);
    }
}

#[test]
fn page_size_changes_grouping_not_membership() {
    let dump = mixed_dump(45);
    let criteria = SearchCriteria::builder().label_contains("name").build();
    let searcher = searcher_for(&dump);

    let by_two = paged(&searcher, &criteria, 2);
    let by_five = paged(&searcher, &criteria, 5);
    let ids = |entities: &[Entity]| entities.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&by_two), ids(&by_five));
}

#[test]
fn unlabeled_entities_never_match() {
    let dump = mixed_dump(30);
    let searcher = searcher_for(&dump);
    for criteria in criteria_variants() {
        let all = paged(&searcher, &criteria, 4);
        assert!(all.iter().all(|entity| entity.label.is_some()));
        assert!(all.iter().all(|entity| entity.id != "Q3" && entity.id != "P10"));
    }
}

#[test]
fn window_past_end_is_empty_not_an_error() {
    let dump = mixed_dump(10);
    let searcher = searcher_for(&dump);
    let criteria = SearchCriteria::any();
    let far = PageCriteria::new(1_000, 10).unwrap();
    assert!(searcher.search(&criteria, &far).unwrap().is_empty());
    // The parked cursor for the following window is exhausted as well.
    assert!(searcher.search(&criteria, &far.next().unwrap()).unwrap().is_empty());
}

#[test]
fn language_selects_labels() {
    let dump = r#"[
        {"id":"Q1","type":"item","labels":{"en":{"value":"apple"},"de":{"value":"Apfel"}}},
        {"id":"Q2","type":"item","labels":{"en":{"value":"pear"}}}
    ]"#;
    let searcher = searcher_for(dump);
    let german = SearchCriteria::builder()
        .language(Language::new("de"))
        .build();
    let entities = searcher
        .search(&german, &PageCriteria::new(0, 10).unwrap())
        .unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].label.as_deref(), Some("Apfel"));
}

#[test]
fn file_backed_dump_matches_in_memory_dump() {
    let dump = mixed_dump(25);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");
    fs::write(&path, &dump).unwrap();

    let criteria = SearchCriteria::any();
    let from_file = WikiDumpSearcher::new(SearchConfig::new(&path)).unwrap();
    assert_eq!(paged(&from_file, &criteria, 6), scan(&dump, &criteria));
}

#[test]
fn missing_dump_file_is_source_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let searcher = WikiDumpSearcher::new(SearchConfig::new(dir.path().join("absent.json"))).unwrap();
    let err = searcher
        .search(&SearchCriteria::any(), &PageCriteria::new(0, 1).unwrap())
        .unwrap_err();
    assert!(matches!(err, SearchError::SourceUnavailable { .. }));
}
