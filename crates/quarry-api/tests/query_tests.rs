mod common;

use common::*;
use quarry::{
    Case, Database, Error, OrderDirection, QueryBuilder, QueryExt, Store, Timestamp, Value,
};

#[test]
fn test_query_between() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let results = store
        .query("AllTypes")
        .unwrap()
        .between(FIELD_LONG, 0, 9)
        .unwrap()
        .find_all()
        .unwrap();
    assert_eq!(results.len(), 10);

    let results = store
        .query("AllTypes")
        .unwrap()
        .begins_with(FIELD_STRING, "test data ")
        .unwrap()
        .find_all()
        .unwrap();
    assert_eq!(results.len(), 200);

    let results = store
        .query("AllTypes")
        .unwrap()
        .begins_with(FIELD_STRING, "test data 1")
        .unwrap()
        .between(FIELD_LONG, 2, 20)
        .unwrap()
        .find_all()
        .unwrap();
    assert_eq!(results.len(), 10);

    let results = store
        .query("AllTypes")
        .unwrap()
        .between(FIELD_LONG, 2, 20)
        .unwrap()
        .begins_with(FIELD_STRING, "test data 1")
        .unwrap()
        .find_all()
        .unwrap();
    assert_eq!(results.len(), 10);
}

#[test]
fn test_query_greater_than() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let count = store
        .query("AllTypes")
        .unwrap()
        .greater_than(FIELD_FLOAT, 10.234567_f32)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 200 - 10);

    let count = store
        .query("AllTypes")
        .unwrap()
        .begins_with(FIELD_STRING, "test data 1")
        .unwrap()
        .greater_than(FIELD_FLOAT, 50.234567_f32)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 200 - 100);

    let query = store
        .query("AllTypes")
        .unwrap()
        .greater_than(FIELD_FLOAT, 11.234567_f32)
        .unwrap();
    let results = query.between(FIELD_LONG, 1, 20).unwrap().find_all().unwrap();
    assert_eq!(results.len(), 10);
}

#[test]
fn test_query_greater_than_or_equal_to() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let count = store
        .query("AllTypes")
        .unwrap()
        .greater_than_or_equal_to(FIELD_FLOAT, 10.234567_f32)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 200 - 9);

    let count = store
        .query("AllTypes")
        .unwrap()
        .begins_with(FIELD_STRING, "test data 1")
        .unwrap()
        .greater_than_or_equal_to(FIELD_FLOAT, 50.234567_f32)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 200 - 100);

    let query = store
        .query("AllTypes")
        .unwrap()
        .greater_than_or_equal_to(FIELD_FLOAT, 11.234567_f32)
        .unwrap();
    let query = query.between(FIELD_LONG, 1, 20).unwrap();
    let results = query
        .begins_with(FIELD_STRING, "test data 15")
        .unwrap()
        .find_all()
        .unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_query_or() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let query = store
        .query("AllTypes")
        .unwrap()
        .equal_to(FIELD_FLOAT, 31.234567_f32)
        .unwrap();

    let query = query.or().unwrap().between(FIELD_LONG, 1, 20).unwrap();
    assert_eq!(query.find_all().unwrap().len(), 21);

    let query = query
        .or()
        .unwrap()
        .equal_to(FIELD_STRING, "test data 15")
        .unwrap();
    assert_eq!(query.find_all().unwrap().len(), 21);

    let query = query
        .or()
        .unwrap()
        .equal_to(FIELD_STRING, "test data 117")
        .unwrap();
    assert_eq!(query.find_all().unwrap().len(), 22);
}

#[test]
fn test_query_implicit_and() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let query = store
        .query("AllTypes")
        .unwrap()
        .equal_to(FIELD_FLOAT, 31.234567_f32)
        .unwrap();
    let results = query.between(FIELD_LONG, 1, 10).unwrap().find_all().unwrap();
    assert_eq!(results.len(), 0);

    let query = store
        .query("AllTypes")
        .unwrap()
        .equal_to(FIELD_FLOAT, 81.234567_f32)
        .unwrap();
    let results = query.between(FIELD_LONG, 1, 100).unwrap().find_all().unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_query_less_than() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let query = store
        .query("AllTypes")
        .unwrap()
        .less_than(FIELD_FLOAT, 31.234567_f32)
        .unwrap();
    assert_eq!(query.find_all().unwrap().len(), 30);

    let results = query.between(FIELD_LONG, 1, 10).unwrap().find_all().unwrap();
    assert_eq!(results.len(), 10);
}

#[test]
fn test_query_less_than_or_equal() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let query = store
        .query("AllTypes")
        .unwrap()
        .less_than_or_equal_to(FIELD_FLOAT, 31.234567_f32)
        .unwrap();
    assert_eq!(query.find_all().unwrap().len(), 31);

    let results = query.between(FIELD_LONG, 11, 20).unwrap().find_all().unwrap();
    assert_eq!(results.len(), 10);
}

#[test]
fn test_query_equal_to() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let count = store
        .query("AllTypes")
        .unwrap()
        .equal_to(FIELD_FLOAT, 31.234567_f32)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 1);

    let count = store
        .query("AllTypes")
        .unwrap()
        .greater_than(FIELD_FLOAT, 11.0_f32)
        .unwrap()
        .equal_to(FIELD_LONG, 10)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 1);

    let count = store
        .query("AllTypes")
        .unwrap()
        .greater_than(FIELD_FLOAT, 11.0_f32)
        .unwrap()
        .equal_to(FIELD_LONG, 1)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_query_equal_to_non_latin_field_names() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    for (long_field, float_field) in [
        (FIELD_LONG_KOREAN_CHAR, FIELD_FLOAT_KOREAN_CHAR),
        (FIELD_LONG_GREEK_CHAR, FIELD_FLOAT_GREEK_CHAR),
    ] {
        let count = store
            .query("NonLatinFieldNames")
            .unwrap()
            .equal_to(long_field, 13)
            .unwrap()
            .count()
            .unwrap();
        assert_eq!(count, 1);

        let count = store
            .query("NonLatinFieldNames")
            .unwrap()
            .greater_than(float_field, 11.0_f32)
            .unwrap()
            .equal_to(long_field, 10)
            .unwrap()
            .count()
            .unwrap();
        assert_eq!(count, 1);

        let count = store
            .query("NonLatinFieldNames")
            .unwrap()
            .greater_than(float_field, 11.0_f32)
            .unwrap()
            .equal_to(long_field, 1)
            .unwrap()
            .count()
            .unwrap();
        assert_eq!(count, 0);
    }
}

#[test]
fn test_non_latin_field_names_are_not_normalised() {
    let db = populated(TEST_DATA_SIZE);
    let store = db.snapshot().unwrap();

    // Lowercased and decomposed spellings are different names
    for name in ["δέλτα", "ΔΈΛΤΑ", "Δε\u{301}λτα"] {
        let err = store
            .query("NonLatinFieldNames")
            .unwrap()
            .equal_to(name, 1)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }), "{}", name);
    }
}

#[test]
fn test_query_not_equal_to() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let count = store
        .query("AllTypes")
        .unwrap()
        .not_equal_to(FIELD_LONG, 31)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 200 - 1);

    let count = store
        .query("AllTypes")
        .unwrap()
        .not_equal_to(FIELD_FLOAT, 11.234567_f32)
        .unwrap()
        .equal_to(FIELD_LONG, 10)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 0);

    let count = store
        .query("AllTypes")
        .unwrap()
        .not_equal_to(FIELD_FLOAT, 11.234567_f32)
        .unwrap()
        .equal_to(FIELD_LONG, 1)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_query_contains_and_case_sensitivity() {
    let db = populated(200);
    let store = db.snapshot().unwrap();

    let count = store
        .query("AllTypes")
        .unwrap()
        .contains_case(FIELD_STRING, "DaTa 0", Case::Insensitive)
        .unwrap()
        .or()
        .unwrap()
        .contains(FIELD_STRING, "20")
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 3);

    let count = store
        .query("AllTypes")
        .unwrap()
        .contains(FIELD_STRING, "DATA")
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 0);

    let count = store
        .query("AllTypes")
        .unwrap()
        .contains_case(FIELD_STRING, "TEST", Case::Insensitive)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 200);
}

#[test]
fn test_query_contains_with_non_latin_characters() {
    let db = populated(TEST_DATA_SIZE);
    db.write(|store| {
        store.clear("AllTypes")?;
        for text in ["Αλφα", "βήτα", "δέλτα"] {
            let object = store.create_object("AllTypes")?;
            store.set(object, FIELD_STRING, text)?;
        }
        Ok(())
    })
    .unwrap();
    let store = db.snapshot().unwrap();

    // Greek capital alpha folds to α, which all three contain
    let count = store
        .query("AllTypes")
        .unwrap()
        .contains_case(FIELD_STRING, "Α", Case::Insensitive)
        .unwrap()
        .or()
        .unwrap()
        .contains(FIELD_STRING, "δ")
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 3);

    // Latin A never matches Greek letters
    let count = store
        .query("AllTypes")
        .unwrap()
        .contains_case(FIELD_STRING, "A", Case::Insensitive)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 0);

    let count = store
        .query("AllTypes")
        .unwrap()
        .contains(FIELD_STRING, "α")
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 3);

    let count = store
        .query("AllTypes")
        .unwrap()
        .contains(FIELD_STRING, "Δ")
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 0);

    let count = store
        .query("AllTypes")
        .unwrap()
        .contains_case(FIELD_STRING, "Δ", Case::Insensitive)
        .unwrap()
        .count()
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_query_with_non_existing_field() {
    let db = populated(TEST_DATA_SIZE);
    let store = db.snapshot().unwrap();

    let err = store
        .query("AllTypes")
        .unwrap()
        .equal_to("NotAField", 13)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidField { .. }));
    assert!(err.is_invalid_argument());
}

#[test]
fn test_query_link() {
    let db = populated(0);
    let (dog1, _dog2) = db
        .write(|store| {
            let owner = store.create_object("Owner")?;
            let dog1 = store.insert(
                "Dog",
                vec![("name", Value::from("Dog 1")), ("weight", Value::from(1))],
            )?;
            let dog2 = store.insert(
                "Dog",
                vec![("name", Value::from("Dog 2")), ("weight", Value::from(2))],
            )?;
            store.add_link(owner, "dogs", dog1)?;
            store.add_link(owner, "dogs", dog2)?;
            Ok((dog1, dog2))
        })
        .unwrap();
    let store = db.snapshot().unwrap();

    // Dog.weight has index 4, past the end of Owner's two-field table
    let owner = store
        .query("Owner")
        .unwrap()
        .find_first()
        .unwrap()
        .unwrap();
    let dogs = store
        .link_list(owner, "dogs")
        .unwrap()
        .query()
        .find_all_sorted("name", OrderDirection::Asc)
        .unwrap();
    let dog = dogs
        .query()
        .equal_to("weight", 1.0_f64)
        .unwrap()
        .find_first()
        .unwrap();
    assert_eq!(dog, Some(dog1));
}

#[test]
fn test_subquery_scope() {
    let db = populated(TEST_DATA_SIZE);
    let store = db.snapshot().unwrap();

    let result = store
        .query("AllTypes")
        .unwrap()
        .less_than(FIELD_LONG, 5)
        .unwrap()
        .find_all()
        .unwrap();
    let sub = result
        .query()
        .greater_than(FIELD_LONG, 3)
        .unwrap()
        .find_all()
        .unwrap();
    assert_eq!(sub.len(), 1);
}

fn count(query: quarry::Result<QueryBuilder<'_, Store>>) -> usize {
    query.unwrap().count().unwrap()
}

#[test]
fn test_query_begins_and_ends_with_case() {
    let db = populated(200);
    let store = db.snapshot().unwrap();
    let query = store.query("AllTypes").unwrap();

    // "test data 1", "test data 10".."19", "test data 100".."199"
    assert_eq!(
        count(query.clone().begins_with_case(FIELD_STRING, "TEST DATA 1", Case::Insensitive)),
        111
    );
    assert_eq!(
        count(query.clone().begins_with_case(FIELD_STRING, "TEST DATA 1", Case::Sensitive)),
        0
    );
    assert_eq!(count(query.clone().begins_with(FIELD_STRING, "test data 1")), 111);

    assert_eq!(count(query.clone().ends_with(FIELD_STRING, "9")), 20);
    assert_eq!(
        count(query.clone().ends_with_case(FIELD_STRING, "DATA 5", Case::Insensitive)),
        1
    );
    assert_eq!(
        count(query.clone().ends_with_case(FIELD_STRING, "DATA 5", Case::Sensitive)),
        0
    );
    assert_eq!(
        count(query.equal_to_case(FIELD_STRING, "Test Data 7", Case::Insensitive)),
        1
    );
}

#[test]
fn test_query_date_ordering() {
    let db = Database::in_memory(schema());
    let day = |n: i64| Timestamp::from_millis(n * 86_400_000);
    db.write(|store| {
        for i in 0..10 {
            store.insert(
                "AllTypes",
                vec![
                    (FIELD_LONG, Value::from(i)),
                    ("columnDate", Value::from(day(i))),
                ],
            )?;
        }
        Ok(())
    })
    .unwrap();

    let store = db.snapshot().unwrap();
    let query = store.query("AllTypes").unwrap();

    let between = query
        .clone()
        .between("columnDate", day(2), day(5))
        .unwrap()
        .find_all()
        .unwrap();
    assert_eq!(between.len(), 4);
    assert_eq!(store.get(between.first().unwrap(), FIELD_LONG).unwrap(), Value::Integer(2));
    assert_eq!(store.get(between.last().unwrap(), FIELD_LONG).unwrap(), Value::Integer(5));

    assert_eq!(count(query.clone().greater_than("columnDate", day(7))), 2);
    assert_eq!(count(query.clone().greater_than_or_equal_to("columnDate", day(7))), 3);
    assert_eq!(count(query.clone().less_than("columnDate", day(0))), 0);
    assert_eq!(count(query.clone().less_than_or_equal_to("columnDate", day(3))), 4);
    assert_eq!(count(query.clone().between("columnDate", day(5), day(2))), 0);

    // Dates only compare with dates
    assert!(matches!(
        query.clone().greater_than("columnDate", 5),
        Err(Error::TypeMismatch { .. })
    ));

    let all = store.all_objects("AllTypes").unwrap();
    let latest = all.find_first_sorted("columnDate", OrderDirection::Desc).unwrap();
    assert_eq!(store.get(latest.unwrap(), "columnDate").unwrap(), Value::Date(day(9)));
    assert_eq!(all.min("columnDate").unwrap(), Some(Value::Date(day(0))));
}
