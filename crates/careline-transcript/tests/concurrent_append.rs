use careline_db::{create_pool, run_migrations, DbRuntimeSettings};
use careline_transcript::{SqliteTranscriptStore, TranscriptStore};
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn racing_appends_on_one_call_are_all_kept() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let pool = create_pool(
        file.path().to_str().unwrap(),
        DbRuntimeSettings {
            busy_timeout_ms: 10_000,
            pool_max_size: 4,
        },
    )
    .unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();

    let store = Arc::new(SqliteTranscriptStore::new(pool.clone()));
    store.create_call("CA-race", "+15550002222").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for n in 0..20 {
                    store
                        .append_entry("CA-race", &format!("Concern: {worker}-{n}"))
                        .expect("append should succeed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let record = store.load_call("CA-race").unwrap().unwrap();
    assert_eq!(record.transcript.len(), 80);

    let distinct: HashSet<_> = record.transcript.iter().map(|e| e.text.clone()).collect();
    assert_eq!(distinct.len(), 80, "no append may clobber another");

    // Positions are dense and start at one.
    let conn = pool.get().unwrap();
    let (min, max, count): (i64, i64, i64) = conn
        .query_row(
            "SELECT MIN(seq), MAX(seq), COUNT(*) FROM transcript_entries WHERE call_sid = ?1",
            ["CA-race"],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!((min, max, count), (1, 80, 80));
}

#[test]
fn per_worker_order_is_preserved() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let pool = create_pool(file.path().to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    run_migrations(&pool.get().unwrap()).unwrap();
    let store = SqliteTranscriptStore::new(pool);

    for n in 0..10 {
        store.append_entry("CA-seq", &format!("line {n}")).unwrap();
    }

    let record = store.load_call("CA-seq").unwrap().unwrap();
    let expected: Vec<String> = (0..10).map(|n| format!("line {n}")).collect();
    let actual: Vec<String> = record.transcript.into_iter().map(|e| e.text).collect();
    assert_eq!(actual, expected);
}
