pub mod file;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::FileStorage;
pub use memory::MemoryStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::SQLiteStorage;

/// Behaviour every backend has to share.
#[cfg(test)]
pub(crate) async fn exercise_store(store: &dyn ln_core::KeyValueStore) {
    use serde_json::json;

    assert!(store.get("missing").await.unwrap().is_none());

    assert_eq!(store.put("a", json!([1])).await.unwrap(), 1);
    assert_eq!(store.put("a", json!([1, 2])).await.unwrap(), 2);
    let stored = store.get("a").await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.value, json!([1, 2]));

    assert_eq!(store.compare_and_swap("a", 2, json!([3])).await.unwrap(), 3);
    let err = store.compare_and_swap("a", 2, json!([4])).await.unwrap_err();
    match err {
        ln_core::Error::Conflict { expected, found, .. } => {
            assert_eq!(expected, 2);
            assert_eq!(found, 3);
        }
        other => panic!("expected conflict, got {other}"),
    }

    assert_eq!(store.compare_and_swap("b", 0, json!(true)).await.unwrap(), 1);
    assert!(store.compare_and_swap("b", 0, json!(false)).await.unwrap_err().is_conflict());

    let mut keys = store.keys().await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

    store.delete("a").await.unwrap();
    assert!(store.get("a").await.unwrap().is_none());
    store.delete("a").await.unwrap();
}
