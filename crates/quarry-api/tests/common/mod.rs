//! Shared fixture for the integration tests.

#![allow(dead_code)]

use quarry::{ClassDef, Database, FieldDef, FieldType, Schema, Timestamp, Value};

pub const FIELD_STRING: &str = "columnString";
pub const FIELD_LONG: &str = "columnLong";
pub const FIELD_FLOAT: &str = "columnFloat";
pub const FIELD_LONG_KOREAN_CHAR: &str = "델타";
pub const FIELD_LONG_GREEK_CHAR: &str = "Δέλτα";
pub const FIELD_FLOAT_KOREAN_CHAR: &str = "베타";
pub const FIELD_FLOAT_GREEK_CHAR: &str = "βήτα";

pub const TEST_DATA_SIZE: usize = 10;

pub fn schema() -> Schema {
    Schema::from_definitions(vec![
        ClassDef::new("AllTypes")
            .field(FIELD_STRING, FieldType::String)
            .field(FIELD_LONG, FieldType::Integer)
            .field(FIELD_FLOAT, FieldType::Float)
            .field("columnDouble", FieldType::Double)
            .field("columnBoolean", FieldType::Boolean)
            .field("columnDate", FieldType::Date)
            .field("columnBinary", FieldType::Binary),
        ClassDef::new("NonLatinFieldNames")
            .field(FIELD_LONG_KOREAN_CHAR, FieldType::Integer)
            .field(FIELD_LONG_GREEK_CHAR, FieldType::Integer)
            .field(FIELD_FLOAT_KOREAN_CHAR, FieldType::Float)
            .field(FIELD_FLOAT_GREEK_CHAR, FieldType::Float),
        ClassDef::new("Owner")
            .field("name", FieldType::String)
            .with(FieldDef::link_list("dogs", "Dog")),
        ClassDef::new("Dog")
            .field("name", FieldType::String)
            .field("age", FieldType::Integer)
            .field("height", FieldType::Float)
            .with(FieldDef::nullable("birthday", FieldType::Date))
            .field("weight", FieldType::Double),
    ])
    .unwrap()
}

/// `columnFloat` of the i-th populated object, computed in single precision.
pub fn float_value(i: usize) -> f32 {
    1.234567_f32 + i as f32
}

/// Replaces all AllTypes and NonLatinFieldNames objects with `objects` fresh ones.
pub fn populate(db: &Database, objects: usize) {
    db.write(|store| {
        store.clear("AllTypes")?;
        store.clear("NonLatinFieldNames")?;
        let now = Timestamp::now();
        for i in 0..objects {
            store.insert(
                "AllTypes",
                vec![
                    ("columnBoolean", Value::from(i % 3 == 0)),
                    ("columnBinary", Value::from(vec![1u8, 2, 3])),
                    ("columnDate", Value::from(now)),
                    ("columnDouble", Value::from(3.1415)),
                    (FIELD_FLOAT, Value::from(float_value(i))),
                    (FIELD_STRING, Value::from(format!("test data {}", i))),
                    (FIELD_LONG, Value::from(i as i64)),
                ],
            )?;
            store.insert(
                "NonLatinFieldNames",
                vec![
                    (FIELD_LONG_KOREAN_CHAR, Value::from(i as i64)),
                    (FIELD_LONG_GREEK_CHAR, Value::from(i as i64)),
                    (FIELD_FLOAT_KOREAN_CHAR, Value::from(float_value(i))),
                    (FIELD_FLOAT_GREEK_CHAR, Value::from(float_value(i))),
                ],
            )?;
        }
        Ok(())
    })
    .unwrap();
}

/// A database populated with `objects` AllTypes and NonLatinFieldNames rows.
pub fn populated(objects: usize) -> Database {
    let db = Database::in_memory(schema());
    populate(&db, objects);
    db
}
