#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use quarry_core::{ClassDef, FieldDef, FieldType, QueryExt, Schema, Value};
use quarry_storage::Store;

#[derive(Arbitrary, Debug)]
enum Field {
    Name,
    Size,
    Ratio,
    Note,
    Parent,
    ParentName,
    Unknown,
}

impl Field {
    fn path(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Size => "size",
            Field::Ratio => "ratio",
            Field::Note => "note",
            Field::Parent => "parent",
            Field::ParentName => "parent.name",
            Field::Unknown => "missing",
        }
    }
}

#[derive(Arbitrary, Debug)]
enum Operand {
    Int(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Bool(bool),
}

impl Operand {
    fn value(&self) -> Value {
        match self {
            Operand::Int(v) => Value::from(*v),
            Operand::Float(v) => Value::from(*v),
            Operand::Double(v) => Value::from(*v),
            Operand::Text(v) => Value::from(v.as_str()),
            Operand::Bool(v) => Value::from(*v),
        }
    }
}

#[derive(Arbitrary, Debug)]
enum Op {
    Equal(Field, Operand),
    NotEqual(Field, Operand),
    Greater(Field, Operand),
    Less(Field, Operand),
    Between(Field, Operand, Operand),
    Contains(Field, String, bool),
    BeginsWith(Field, String, bool),
    IsNull(Field),
    Or,
    And,
    Not,
    BeginGroup,
    EndGroup,
}

fn store() -> Option<Store> {
    let schema = Schema::from_definitions(vec![ClassDef::new("Node")
        .field("name", FieldType::String)
        .field("size", FieldType::Integer)
        .with(FieldDef::nullable("ratio", FieldType::Float))
        .with(FieldDef::nullable("note", FieldType::String))
        .with(FieldDef::link("parent", "Node"))])
    .ok()?;

    let mut store = Store::new(schema);
    let mut previous = None;
    for (i, name) in ["Root", "ΆΛΦΑ", "beta", "Σίσυφος", "델타", ""].iter().enumerate() {
        let node = store
            .insert(
                "Node",
                vec![
                    ("name", Value::from(*name)),
                    ("size", Value::from(i as i64 - 2)),
                    ("ratio", Value::from((i % 2 == 0).then(|| f32::NAN))),
                ],
            )
            .ok()?;
        if let Some(parent) = previous {
            store.set(node, "parent", Value::Link(parent)).ok()?;
        }
        previous = Some(node.key());
    }
    Some(store)
}

fuzz_target!(|ops: Vec<Op>| {
    let Some(store) = store() else {
        return;
    };
    let Ok(mut query) = store.query("Node") else {
        return;
    };

    // Limit operations to prevent timeout
    for op in ops.iter().take(64) {
        let case = |insensitive: bool| {
            if insensitive {
                quarry_core::Case::Insensitive
            } else {
                quarry_core::Case::Sensitive
            }
        };
        let fork = query.clone();
        let next = match op {
            Op::Equal(f, v) => fork.equal_to(f.path(), v.value()),
            Op::NotEqual(f, v) => fork.not_equal_to(f.path(), v.value()),
            Op::Greater(f, v) => fork.greater_than(f.path(), v.value()),
            Op::Less(f, v) => fork.less_than(f.path(), v.value()),
            Op::Between(f, a, b) => fork.between(f.path(), a.value(), b.value()),
            Op::Contains(f, s, i) => fork.contains_case(f.path(), s, case(*i)),
            Op::BeginsWith(f, s, i) => fork.begins_with_case(f.path(), s, case(*i)),
            Op::IsNull(f) => fork.is_null(f.path()),
            Op::Or => fork.or(),
            Op::And => fork.and(),
            Op::Not => fork.not(),
            Op::BeginGroup => fork.begin_group(),
            Op::EndGroup => fork.end_group(),
        };
        // A rejected step leaves the previous builder usable
        if let Ok(next) = next {
            query = next;
        }
    }

    // Terminals agree with each other whenever the chain is complete
    if let (Ok(all), Ok(count), Ok(first)) = (query.find_all(), query.count(), query.find_first())
    {
        assert_eq!(all.len(), count);
        assert_eq!(all.first(), first);
        if let Ok(sub) = all.query().count() {
            assert_eq!(sub, count);
        }
    }
});
