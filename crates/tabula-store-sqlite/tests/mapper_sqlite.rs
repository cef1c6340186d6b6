// crates/tabula-store-sqlite/tests/mapper_sqlite.rs
// ============================================================================
// Module: Mapper Over SQLite Tests
// Description: End-to-end CRUD behavior against a real SQLite engine.
// Purpose: Validate round trips, id stability, filters, and references.
// ============================================================================

//! ## Overview
//! Runs the mapper against an in-memory `SQLite` gateway:
//! - Speaker/talk walkthrough with an OR filter on one field
//! - Save/select round trip and stable ids across updates
//! - Boolean filters checked against an in-memory fixture
//! - Reference hydration, dangling references, and table lifecycle errors

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use tabula_core::Condition;
use tabula_core::DeclaredType;
use tabula_core::Mapper;
use tabula_core::OrmError;
use tabula_core::Params;
use tabula_core::Record;
use tabula_core::Schema;
use tabula_core::SchemaDecl;
use tabula_core::SqlValue;
use tabula_core::StoreError;
use tabula_core::StoreGateway;
use tabula_core::Value;
use tabula_core::register_schema;
use tabula_store_sqlite::SqliteGateway;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct Fixture {
    mapper: Mapper<SqliteGateway>,
    speaker: Arc<Schema>,
    talk: Arc<Schema>,
}

fn fixture() -> Fixture {
    let speaker = register_schema(
        SchemaDecl::new("Speaker")
            .field("name", DeclaredType::Text)
            .field("company", DeclaredType::Text),
    )
    .unwrap();
    let talk = register_schema(
        SchemaDecl::new("Talk")
            .field("title", DeclaredType::Text)
            .field("duration", DeclaredType::Integer)
            .field("speaker", DeclaredType::Reference(Arc::clone(&speaker))),
    )
    .unwrap();
    let mapper = Mapper::new(SqliteGateway::open_in_memory().unwrap());
    mapper.create_table(&speaker).unwrap();
    mapper.create_table(&talk).unwrap();
    Fixture {
        mapper,
        speaker,
        talk,
    }
}

fn select_all(
    mapper: &Mapper<SqliteGateway>,
    schema: &Arc<Schema>,
    filter: Option<&Condition>,
) -> Vec<Record> {
    mapper.select(schema, filter).unwrap().collect::<Result<_, _>>().unwrap()
}

// ============================================================================
// SECTION: Walkthrough
// ============================================================================

#[test]
fn speaker_talk_walkthrough() {
    let Fixture {
        mapper,
        speaker,
        talk,
    } = fixture();

    let mut jonathan = mapper
        .new_record(&speaker, [("name", "Jonathan"), ("company", "solute")])
        .unwrap();
    mapper.save(&mut jonathan).unwrap();
    assert_eq!(jonathan.id(), Some(1));

    let mut orm_talk = mapper
        .new_record(
            &talk,
            [
                ("title", Value::from("ORM in 45min")),
                ("duration", Value::from(45)),
                ("speaker", Value::from(jonathan.clone())),
            ],
        )
        .unwrap();
    mapper.save(&mut orm_talk).unwrap();
    assert_eq!(orm_talk.id(), Some(1));
    let stored = mapper.find(&talk, 1).unwrap().unwrap();
    assert_eq!(stored.get("duration").unwrap().as_integer(), Some(45));

    mapper.assign(&mut orm_talk, "duration", 60).unwrap();
    mapper.save(&mut orm_talk).unwrap();
    assert_eq!(orm_talk.id(), Some(1));

    let duration = talk.field("duration").unwrap();
    let filter = duration.equals(60) | duration.equals(45);
    let found = select_all(&mapper, &talk, Some(&filter));
    assert_eq!(found.len(), 1);
    let loaded = &found[0];
    assert_eq!(loaded.get("title").unwrap().as_text(), Some("ORM in 45min"));
    assert_eq!(loaded.get("duration").unwrap().as_integer(), Some(60));
    let author = loaded.get("speaker").unwrap().as_record().unwrap();
    assert_eq!(author.id(), Some(1));
    assert_eq!(author.get("name").unwrap().as_text(), Some("Jonathan"));
}

// ============================================================================
// SECTION: Round Trip
// ============================================================================

#[test]
fn saved_record_round_trips_field_values() {
    let Fixture {
        mapper,
        speaker,
        ..
    } = fixture();
    let mut record = mapper
        .new_record(&speaker, [("name", Value::from("Ana")), ("company", Value::Null)])
        .unwrap();
    mapper.save(&mut record).unwrap();
    let loaded = mapper.find(&speaker, record.id().unwrap()).unwrap().unwrap();
    assert_eq!(loaded, record);
    assert!(loaded.get("company").unwrap().is_null());
}

#[test]
fn real_fields_round_trip() {
    let mapper = Mapper::new(SqliteGateway::open_in_memory().unwrap());
    let metric = register_schema(
        SchemaDecl::new("Metric")
            .field("label", DeclaredType::Text)
            .field("ratio", DeclaredType::Real),
    )
    .unwrap();
    mapper.create_table(&metric).unwrap();
    let mut record = mapper
        .new_record(&metric, [("label", Value::from("hit")), ("ratio", Value::from(0.25))])
        .unwrap();
    mapper.save(&mut record).unwrap();
    let loaded = mapper.find(&metric, record.id().unwrap()).unwrap().unwrap();
    assert_eq!(loaded.get("ratio").unwrap().as_real(), Some(0.25));
}

#[test]
fn update_keeps_id_and_row_count() {
    let Fixture {
        mapper,
        speaker,
        ..
    } = fixture();
    let mut record = mapper.new_record(&speaker, [("name", "Ana")]).unwrap();
    mapper.save(&mut record).unwrap();
    let id = record.id();
    for company in ["Acme", "Initech", "Globex"] {
        mapper.assign(&mut record, "company", company).unwrap();
        mapper.save(&mut record).unwrap();
        assert_eq!(record.id(), id);
    }
    let all = select_all(&mapper, &speaker, None);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get("company").unwrap().as_text(), Some("Globex"));
}

#[test]
fn empty_schema_records_get_distinct_ids() {
    let mapper = Mapper::new(SqliteGateway::open_in_memory().unwrap());
    let marker = register_schema(SchemaDecl::new("Marker")).unwrap();
    mapper.create_table(&marker).unwrap();
    let mut first = Record::new(&marker);
    let mut second = Record::new(&marker);
    mapper.save(&mut first).unwrap();
    mapper.save(&mut second).unwrap();
    mapper.save(&mut second).unwrap();
    assert_eq!(first.id(), Some(1));
    assert_eq!(second.id(), Some(2));
    assert_eq!(select_all(&mapper, &marker, None).len(), 2);
}

// ============================================================================
// SECTION: Filters
// ============================================================================

#[test]
fn boolean_filters_match_in_memory_evaluation() {
    let Fixture {
        mapper,
        talk,
        ..
    } = fixture();
    let durations = [15_i64, 30, 45, 60, 90];
    for (index, duration) in durations.iter().enumerate() {
        let mut record = mapper
            .new_record(
                &talk,
                [
                    ("title", Value::from(format!("talk-{index}"))),
                    ("duration", Value::from(*duration)),
                ],
            )
            .unwrap();
        mapper.save(&mut record).unwrap();
    }
    let field = talk.field("duration").unwrap();
    let cases: Vec<(Condition, fn(i64) -> bool)> = vec![
        (field.equals(30) | field.equals(90), |d| d == 30 || d == 90),
        (field.greater_than(20) & field.less_than(60), |d| d > 20 && d < 60),
        (
            (field.less_or_equal(15) | field.greater_or_equal(90)) | field.equals(45),
            |d| d <= 15 || d >= 90 || d == 45,
        ),
        (
            field.not_equals(60) & (field.equals(60) | field.equals(30)),
            |d| d != 60 && (d == 60 || d == 30),
        ),
        (field.equals(1) | field.equals(2), |_| false),
    ];
    for (condition, expected) in cases {
        let mut selected: Vec<i64> = select_all(&mapper, &talk, Some(&condition))
            .iter()
            .map(|record| record.get("duration").unwrap().as_integer().unwrap())
            .collect();
        selected.sort_unstable();
        let wanted: Vec<i64> = durations.iter().copied().filter(|d| expected(*d)).collect();
        assert_eq!(selected, wanted);
    }
}

#[test]
fn select_by_reference_uses_identifier() {
    let Fixture {
        mapper,
        speaker,
        talk,
    } = fixture();
    let mut ana = mapper.new_record(&speaker, [("name", "Ana")]).unwrap();
    let mut bo = mapper.new_record(&speaker, [("name", "Bo")]).unwrap();
    mapper.save(&mut ana).unwrap();
    mapper.save(&mut bo).unwrap();
    for (title, author) in [("one", &ana), ("two", &bo), ("three", &bo)] {
        let mut record = mapper
            .new_record(&talk, [("title", Value::from(title)), ("speaker", Value::from(author))])
            .unwrap();
        mapper.save(&mut record).unwrap();
    }
    let by_bo = select_all(&mapper, &talk, Some(&talk.field("speaker").unwrap().equals(&bo)));
    assert_eq!(by_bo.len(), 2);
    assert!(by_bo.iter().all(|record| {
        let author = record.get("speaker").unwrap().as_record().unwrap();
        author.get("name").unwrap().as_text() == Some("Bo")
    }));
}

#[test]
fn selection_is_reissued_on_each_call() {
    let Fixture {
        mapper,
        speaker,
        ..
    } = fixture();
    assert!(select_all(&mapper, &speaker, None).is_empty());
    let mut record = mapper.new_record(&speaker, [("name", "Ana")]).unwrap();
    mapper.save(&mut record).unwrap();
    assert_eq!(select_all(&mapper, &speaker, None).len(), 1);
}

// ============================================================================
// SECTION: References
// ============================================================================

#[test]
fn assigning_reference_id_loads_the_record() {
    let Fixture {
        mapper,
        speaker,
        talk,
    } = fixture();
    let mut ana = mapper.new_record(&speaker, [("name", "Ana")]).unwrap();
    mapper.save(&mut ana).unwrap();
    let mut record = Record::new(&talk);
    mapper.assign(&mut record, "speaker", ana.id().unwrap()).unwrap();
    assert_eq!(record.get("speaker").unwrap().as_record(), Some(&ana));
    assert!(matches!(
        mapper.assign(&mut record, "speaker", 99),
        Err(OrmError::MissingReference { id: 99, .. })
    ));
}

#[test]
fn dangling_reference_fails_hydration() {
    let Fixture {
        mapper,
        talk,
        ..
    } = fixture();
    mapper
        .gateway()
        .run_write(
            "INSERT INTO talks (title, speaker) VALUES (:title, :speaker)",
            &[
                ("title".to_string(), SqlValue::Text("orphan".to_string())),
                ("speaker".to_string(), SqlValue::Integer(77)),
            ]
            .into_iter()
            .collect::<Params>(),
        )
        .unwrap();
    let results: Vec<_> = mapper.select(&talk, None).unwrap().collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(&results[0], Err(OrmError::MissingReference { id: 77, .. })));
}

#[test]
fn unsaved_reference_fails_save() {
    let Fixture {
        mapper,
        speaker,
        talk,
    } = fixture();
    let mut record = mapper
        .new_record(
            &talk,
            [("title", Value::from("draft")), ("speaker", Value::from(Record::new(&speaker)))],
        )
        .unwrap();
    assert!(matches!(mapper.save(&mut record), Err(OrmError::UnresolvedReference { .. })));
    assert!(select_all(&mapper, &talk, None).is_empty());
}

// ============================================================================
// SECTION: Table Lifecycle
// ============================================================================

#[test]
fn creating_existing_table_fails() {
    let Fixture {
        mapper,
        speaker,
        ..
    } = fixture();
    assert!(matches!(mapper.create_table(&speaker), Err(OrmError::Store(StoreError::Store(_)))));
}

#[test]
fn drop_table_is_idempotent() {
    let Fixture {
        mapper,
        talk,
        ..
    } = fixture();
    mapper.drop_table(&talk).unwrap();
    mapper.drop_table(&talk).unwrap();
    assert!(matches!(mapper.select(&talk, None), Err(OrmError::Store(_))));
    mapper.create_table(&talk).unwrap();
}

#[test]
fn unsupported_type_creates_nothing() {
    let mapper = Mapper::new(SqliteGateway::open_in_memory().unwrap());
    let photo = register_schema(
        SchemaDecl::new("Photo")
            .field("caption", DeclaredType::Text)
            .field("pixels", DeclaredType::Custom("bytes".to_string())),
    )
    .unwrap();
    assert!(matches!(mapper.create_table(&photo), Err(OrmError::UnsupportedType { .. })));
    assert!(matches!(mapper.select(&photo, None), Err(OrmError::Store(_))));
}
