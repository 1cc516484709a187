use std::{
    fs,
    sync::{Arc, Mutex},
};

use tempfile::TempDir;

use prefstore::{
    config::{Backend, PrefsConfig},
    core::store::{StoreError, StoreSnapshotV1},
    persist::{
        PersistError, PersistResult, PrefSink,
        json::JsonFileSink,
        sqlite::SqliteSink,
    },
    prefs::Prefs,
    record::Record,
    types::ValueType,
};

#[derive(Clone, Default)]
struct CountingSink {
    stored: Arc<Mutex<Option<StoreSnapshotV1>>>,
    saves: Arc<Mutex<usize>>,
}

impl CountingSink {
    fn saves(&self) -> usize {
        *self.saves.lock().expect("lock")
    }

    fn stored(&self) -> StoreSnapshotV1 {
        self.stored.lock().expect("lock").clone().expect("snapshot")
    }
}

impl PrefSink for CountingSink {
    fn load(&mut self) -> PersistResult<Option<StoreSnapshotV1>> {
        Ok(self.stored.lock().expect("lock").clone())
    }

    fn save(&mut self, snapshot: &StoreSnapshotV1) -> PersistResult<()> {
        *self.stored.lock().expect("lock") = Some(snapshot.clone());
        *self.saves.lock().expect("lock") += 1;
        Ok(())
    }
}

#[test]
fn first_open_creates_file_with_revision() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("nested").join("prefs.json");

    let prefs = Prefs::open_path(&path, 42).expect("open");
    assert!(path.exists());
    assert_eq!(prefs.revision(), 42);
    drop(prefs);

    let reopened = Prefs::open_path(&path, 99).expect("reopen");
    assert_eq!(reopened.revision(), 42);
    assert!(reopened.records().is_empty());
}

#[test]
fn json_round_trips_values_and_order() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("prefs.json");

    {
        let mut prefs = Prefs::open_path(&path, 1).expect("open");
        prefs.set_string("z.last", "zed").expect("set");
        prefs.set_int("a.first", 7).expect("set");
        prefs.set_float("m.mid", 0.125).expect("set");
        prefs.set_bool("flag", true).expect("set");
        prefs.add_to_set("tags", "b").expect("add");
        prefs.add_to_set("tags", "a").expect("add");
    }

    let prefs = Prefs::open_path(&path, 1).expect("reopen");
    let keys: Vec<_> = prefs.records().iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["z.last", "a.first", "m.mid", "flag", "tags"]);
    assert_eq!(prefs.get_string("z.last", ""), "zed");
    assert_eq!(prefs.get_int("a.first", 0), 7);
    assert_eq!(prefs.get_float("m.mid", 0.0), 0.125);
    assert!(prefs.get_bool("flag", false));
    assert_eq!(prefs.get_set("tags", Vec::new()), vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn json_file_is_human_readable() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("prefs.json");

    let mut prefs = Prefs::open_path(&path, 5).expect("open");
    prefs.set_int("count", 3).expect("set");

    let text = fs::read_to_string(&path).expect("read");
    let json: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(json["format_version"], 1);
    assert_eq!(json["snapshot"]["revision"], 5);
    assert_eq!(json["snapshot"]["records"][0]["key"], "count");
    assert_eq!(json["snapshot"]["records"][0]["type"], "Int");
    assert_eq!(json["snapshot"]["records"][0]["value"], "3");
}

#[test]
fn set_mutations_are_saved_immediately() {
    let sink = CountingSink::default();
    let mut prefs = Prefs::with_sink(Box::new(sink.clone()), 1).expect("open");
    assert_eq!(sink.saves(), 1);

    prefs.add_to_set("k", "a").expect("add");
    prefs.add_to_set("k", "b").expect("add");
    assert_eq!(sink.stored().records[0].value, "a;b");

    prefs.remove_from_set("k", "a").expect("remove");
    assert_eq!(sink.stored().records[0].value, "b");
    assert!(!prefs.is_dirty());
    assert_eq!(sink.saves(), 4);
}

#[test]
fn noop_writes_do_not_save() {
    let sink = CountingSink::default();
    let mut prefs = Prefs::with_sink(Box::new(sink.clone()), 1).expect("open");

    prefs.set_int("k", 1).expect("set");
    let after_first = sink.saves();

    prefs.set_int("k", 1).expect("set");
    prefs.add_to_set("s", "a").expect("add");
    let after_add = sink.saves();
    prefs.add_to_set("s", "a").expect("add");
    prefs.remove_from_set("s", "zzz").expect("remove");
    prefs.remove_from_set("missing", "a").expect("remove");
    prefs.delete_key("missing").expect("delete");

    assert_eq!(after_add, after_first + 1);
    assert_eq!(sink.saves(), after_add);
    assert!(!prefs.is_dirty());
}

#[test]
fn delete_key_is_saved() {
    let sink = CountingSink::default();
    let mut prefs = Prefs::with_sink(Box::new(sink.clone()), 1).expect("open");
    prefs.set_int("k", 1).expect("set");
    prefs.delete_key("k").expect("delete");

    assert!(!prefs.has_key("k"));
    assert!(sink.stored().records.is_empty());
}

#[test]
fn batch_saves_once() {
    let sink = CountingSink::default();
    let mut prefs = Prefs::with_sink(Box::new(sink.clone()), 1).expect("open");
    let before = sink.saves();

    prefs
        .batch(|store| {
            store.set("a", &1i32)?;
            store.set("b", &2i32)?;
            store.add_to_set("c", "x")?;
            Ok(())
        })
        .expect("batch");

    assert_eq!(sink.saves(), before + 1);
    assert_eq!(sink.stored().records.len(), 3);
}

#[test]
fn failed_batch_stays_dirty_and_flushes_on_drop() {
    let sink = CountingSink::default();
    {
        let mut prefs = Prefs::with_sink(Box::new(sink.clone()), 1).expect("open");
        let err = prefs
            .batch(|store| {
                store.set("a", &1i32)?;
                store.add_to_set("b", "bad;element")?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSetElement(_)));
        assert!(prefs.is_dirty());
        assert!(sink.stored().records.is_empty());
    }
    assert_eq!(sink.stored().records.len(), 1);
}

#[test]
fn hand_edited_duplicates_are_merged() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("prefs.json");
    let snapshot = StoreSnapshotV1 {
        revision: 3,
        records: vec![
            Record::new("dup", ValueType::Int, "1"),
            Record::new("dup", ValueType::String, "shadowed"),
            Record::new("bad", ValueType::Int, "abc"),
        ],
    };
    JsonFileSink::new(&path).save(&snapshot).expect("seed");

    let prefs = Prefs::open_path(&path, 0).expect("open");
    assert!(prefs.is_dirty());
    assert_eq!(prefs.records().len(), 2);
    assert_eq!(prefs.get_int("dup", 0), 1);
    assert_eq!(prefs.get_int("bad", -5), -5);
    prefs.close().expect("close");

    let mut sink = JsonFileSink::new(&path);
    let stored = sink.load().expect("load").expect("snapshot");
    assert_eq!(stored.records.len(), 2);
}

#[test]
fn unsupported_format_version_is_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("prefs.json");
    fs::write(
        &path,
        r#"{"format_version": 9, "snapshot": {"revision": 1, "records": []}}"#,
    )
    .expect("write");

    let err = Prefs::open_path(&path, 0).err().expect("error");
    assert!(matches!(
        err,
        StoreError::Persist(PersistError::UnsupportedFormat(9))
    ));
}

#[test]
fn malformed_file_is_an_error() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("prefs.json");
    fs::write(&path, "not json").expect("write");

    let err = Prefs::open_path(&path, 0).err().expect("error");
    assert!(matches!(err, StoreError::Persist(PersistError::Json(_))));
}

#[test]
fn sqlite_backend_round_trips() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("prefs.db");
    let cfg = PrefsConfig::new(&path)
        .with_backend(Backend::Sqlite)
        .with_initial_revision(11);

    {
        let mut prefs = Prefs::open(&cfg).expect("open");
        prefs.set_int("b", 2).expect("set");
        prefs.set_int("a", 1).expect("set");
        prefs.add_to_set("s", "x").expect("add");
    }

    let prefs = Prefs::open(&cfg.clone().with_initial_revision(0)).expect("reopen");
    assert_eq!(prefs.revision(), 11);
    let keys: Vec<_> = prefs.records().iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["b", "a", "s"]);
    assert!(prefs.set_contains("s", "x"));
    drop(prefs);

    let sink = SqliteSink::open(&path).expect("open sink");
    assert_eq!(sink.snapshot_count().expect("count"), 1);
}

#[test]
fn sqlite_in_memory_sink_starts_empty() {
    let mut sink = SqliteSink::open_in_memory().expect("open");
    assert!(sink.load().expect("load").is_none());

    let snapshot = StoreSnapshotV1 {
        revision: 2,
        records: vec![Record::new("k", ValueType::Bool, "true")],
    };
    sink.save(&snapshot).expect("save");
    sink.save(&snapshot).expect("save");
    assert_eq!(sink.load().expect("load"), Some(snapshot));
    assert_eq!(sink.snapshot_count().expect("count"), 1);
}

#[test]
fn drop_without_flush_discards_editor_changes() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("prefs.json");
    let cfg = PrefsConfig::new(&path).with_flush_on_drop(false);

    {
        let mut prefs = Prefs::open(&cfg).expect("open");
        let mut editor = prefs.editor();
        editor.add_record();
        assert!(editor.is_dirty());
    }

    let prefs = Prefs::open(&cfg).expect("reopen");
    assert!(prefs.records().is_empty());
}
