use std::collections::BTreeSet;

use proptest::prelude::*;

use prefstore::{
    core::{
        set::{decode_set, encode_set},
        store::{PrefStore, StoreError},
    },
    record::Record,
    types::ValueType,
};

#[derive(Debug, Clone)]
enum Action {
    SetInt { key: u8, value: i32 },
    SetString { key: u8, value: String },
    AddToSet { key: u8, elem: u8 },
    RemoveFromSet { key: u8, elem: u8 },
    Delete { key: u8 },
    MoveUp { index: u8 },
    SortAll,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..8, any::<i32>()).prop_map(|(key, value)| Action::SetInt { key, value }),
        (0u8..8, "[a-z ]{0,6}").prop_map(|(key, value)| Action::SetString { key, value }),
        (0u8..8, 0u8..6).prop_map(|(key, elem)| Action::AddToSet { key, elem }),
        (0u8..8, 0u8..6).prop_map(|(key, elem)| Action::RemoveFromSet { key, elem }),
        (0u8..8).prop_map(|key| Action::Delete { key }),
        (0u8..10).prop_map(|index| Action::MoveUp { index }),
        Just(Action::SortAll),
    ]
}

fn key_name(key: u8) -> String {
    format!("key{key}")
}

fn elem_name(elem: u8) -> String {
    format!("e{elem}")
}

/// Straightforward reference implementation over a plain vector.
#[derive(Default)]
struct Model {
    records: Vec<Record>,
}

impl Model {
    fn find(&mut self, key: &str) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.key == key)
    }

    fn set(&mut self, key: &str, value_type: ValueType, value: String) {
        match self.find(key) {
            Some(rec) => {
                rec.value_type = value_type;
                rec.value = value;
            }
            None => self.records.push(Record::new(key, value_type, value)),
        }
    }

    fn add_to_set(&mut self, key: &str, elem: &str) -> bool {
        match self.find(key) {
            Some(rec) if rec.value_type != ValueType::Set => false,
            Some(rec) => {
                let mut set = decode_set(&rec.value);
                if !set.iter().any(|e| e == elem) {
                    set.push(elem.to_string());
                }
                rec.value = encode_set(&set);
                true
            }
            None => {
                self.records.push(Record::new(key, ValueType::Set, elem));
                true
            }
        }
    }

    fn remove_from_set(&mut self, key: &str, elem: &str) -> bool {
        match self.find(key) {
            Some(rec) if rec.value_type != ValueType::Set => false,
            Some(rec) => {
                if decode_set(&rec.value).iter().any(|e| e == elem) {
                    let set: Vec<String> =
                        decode_set(&rec.value).into_iter().filter(|e| e != elem).collect();
                    rec.value = encode_set(&set);
                }
                true
            }
            None => true,
        }
    }
}

proptest! {
    #[test]
    fn random_sequences_match_reference_model(actions in prop::collection::vec(action_strategy(), 1..150)) {
        let mut store = PrefStore::new(0);
        let mut model = Model::default();

        for action in actions {
            match action {
                Action::SetInt { key, value } => {
                    store.set(&key_name(key), &value).expect("set");
                    model.set(&key_name(key), ValueType::Int, value.to_string());
                }
                Action::SetString { key, value } => {
                    store.set(&key_name(key), &value).expect("set");
                    model.set(&key_name(key), ValueType::String, value);
                }
                Action::AddToSet { key, elem } => {
                    let ok = model.add_to_set(&key_name(key), &elem_name(elem));
                    let res = store.try_add_to_set(&key_name(key), &elem_name(elem));
                    prop_assert_eq!(ok, res.is_ok());
                    if let Err(err) = res {
                        prop_assert!(
                            matches!(err, StoreError::TypeMismatch { .. }),
                            "expected type mismatch, got {:?}",
                            err
                        );
                    }
                }
                Action::RemoveFromSet { key, elem } => {
                    let ok = model.remove_from_set(&key_name(key), &elem_name(elem));
                    let res = store.try_remove_from_set(&key_name(key), &elem_name(elem));
                    prop_assert_eq!(ok, res.is_ok());
                }
                Action::Delete { key } => {
                    store.delete_key(&key_name(key));
                    model.records.retain(|r| r.key != key_name(key));
                }
                Action::MoveUp { index } => {
                    let i = usize::from(index);
                    store.move_up(i);
                    if i > 0 && i < model.records.len() {
                        model.records.swap(i - 1, i);
                    }
                }
                Action::SortAll => {
                    store.sort_all();
                    model.records.sort_by(|a, b| a.key.cmp(&b.key));
                    for rec in &mut model.records {
                        rec.sort();
                    }
                }
            }

            prop_assert_eq!(store.records(), model.records.as_slice());

            let mut seen = BTreeSet::new();
            for (i, rec) in store.records().iter().enumerate() {
                prop_assert!(seen.insert(rec.key.clone()), "duplicate key {}", rec.key);
                prop_assert_eq!(store.position(&rec.key), Some(i));
            }
        }

        let restored = PrefStore::from_snapshot(store.export_snapshot());
        prop_assert_eq!(restored.records(), store.records());
    }

    #[test]
    fn set_codec_round_trips(elems in prop::collection::vec("[a-zA-Z0-9_.]{1,8}", 0..12)) {
        prop_assert_eq!(decode_set(&encode_set(&elems)), elems);
    }

    #[test]
    fn typed_round_trip_for_ints_and_floats(i in any::<i32>(), f in -1.0e6f32..1.0e6f32) {
        let mut store = PrefStore::new(0);
        store.set("i", &i).expect("set");
        store.set("f", &f).expect("set");
        prop_assert_eq!(store.get("i", 0i32), i);
        prop_assert_eq!(store.get("f", 0.0f32), f);
    }
}
