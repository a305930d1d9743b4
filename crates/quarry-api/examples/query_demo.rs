/// Query API Demo
///
/// Builds a small kennel, then walks through chained predicates, or(),
/// groups, link traversal, subqueries and aggregates.
use quarry::{
    Case, ClassDef, Database, FieldDef, FieldType, ObjectRef, OrderDirection, QueryExt, Schema,
    Value,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Quarry Query Demo ===\n");

    let schema = Schema::from_definitions(vec![
        ClassDef::new("Owner")
            .field("name", FieldType::String)
            .with(FieldDef::link_list("dogs", "Dog")),
        ClassDef::new("Dog")
            .field("name", FieldType::String)
            .field("age", FieldType::Integer)
            .field("weight", FieldType::Double)
            .with(FieldDef::nullable("birthday", FieldType::Date)),
    ])?;
    let db = Database::in_memory(schema);

    db.write(|store| {
        for (owner, dogs) in [
            ("Tim", vec![("Rex", 7, 31.5), ("Fido", 2, 8.0)]),
            ("Ana", vec![("Bella", 4, 22.0)]),
            ("Åsa", vec![("Δίας", 11, 40.2), ("Milo", 1, 3.4)]),
        ] {
            let owner = store.insert("Owner", vec![("name", Value::from(owner))])?;
            for (name, age, weight) in dogs {
                let dog = store.insert(
                    "Dog",
                    vec![
                        ("name", Value::from(name)),
                        ("age", Value::from(age)),
                        ("weight", Value::from(weight)),
                    ],
                )?;
                store.add_link(owner, "dogs", dog)?;
            }
        }
        Ok(())
    })?;

    let store = db.snapshot()?;
    let name_of = |object: ObjectRef| -> quarry::Result<Value> { store.get(object, "name") };

    println!("1. Implicit AND: age > 1 and weight < 25");
    let results = store
        .query("Dog")?
        .greater_than("age", 1)?
        .less_than("weight", 25)?
        .find_all()?;
    for dog in &results {
        println!("   {}", name_of(dog)?);
    }

    println!("\n2. or() binds to the next predicate only");
    let results = store
        .query("Dog")?
        .equal_to("name", "Rex")?
        .or()?
        .equal_to("name", "Milo")?
        .greater_than("age", 5)?
        .find_all()?;
    println!("   (Rex OR Milo) AND age > 5 -> {} match(es)", results.len());

    println!("\n3. Groups and negation");
    let count = store
        .query("Dog")?
        .not()?
        .begin_group()?
        .less_than("age", 3)?
        .or()?
        .greater_than("weight", 35)?
        .end_group()?
        .count()?;
    println!("   NOT (age < 3 OR weight > 35) -> {}", count);

    println!("\n4. Case-insensitive text matching");
    let count = store
        .query("Dog")?
        .contains_case("name", "ΔΊ", Case::Insensitive)?
        .count()?;
    println!("   name contains 'ΔΊ' (any case) -> {}", count);

    println!("\n5. Link traversal");
    let owners = store
        .query("Owner")?
        .greater_than("dogs.weight", 30.0)?
        .find_all_sorted("name", OrderDirection::Asc)?;
    for owner in &owners {
        println!("   {} owns a dog over 30kg", name_of(owner)?);
    }

    println!("\n6. Subquery over a link list");
    if let Some(tim) = store.query("Owner")?.equal_to("name", "Tim")?.find_first()? {
        let dogs = store.link_list(tim, "dogs")?;
        let young = dogs.query().less_than("age", 5)?.find_all()?;
        println!("   Tim has {} dog(s), {} under five", dogs.len(), young.len());
    }

    println!("\n7. Aggregates");
    let all = store.all_objects("Dog")?;
    println!("   total age:      {}", all.sum("age")?);
    println!("   average weight: {:?}", all.average("weight")?);
    println!("   heaviest:       {:?}", all.max("weight")?);
    println!("   unknown birthdays: {}", store.query("Dog")?.is_null("birthday")?.count()?);

    println!("\n=== Demo Complete ===");
    Ok(())
}
