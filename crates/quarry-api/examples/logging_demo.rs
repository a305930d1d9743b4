use quarry::logging::LogConfig;
use quarry::{ClassDef, Database, FieldType, QueryExt, Schema, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Debug level shows query summaries and rejected predicates
    let _guard = LogConfig::debug().init()?;

    println!("=== Quarry Logging Demo ===\n");

    let schema = Schema::from_definitions(vec![ClassDef::new("Event")
        .field("kind", FieldType::String)
        .field("severity", FieldType::Integer)])?;
    let db = Database::in_memory(schema);

    println!("1. Committing a transaction...");
    db.write(|store| {
        for (kind, severity) in [("boot", 1), ("disk", 4), ("net", 2), ("disk", 5)] {
            store.insert(
                "Event",
                vec![("kind", Value::from(kind)), ("severity", Value::from(severity))],
            )?;
        }
        Ok(())
    })?;

    println!("\n2. Rolling back a transaction...");
    let rolled_back = db.write(|store| {
        let event = store.create_object("Event")?;
        store.set(event, "priority", 3)
    });
    if let Err(err) = rolled_back {
        println!("Rolled back: {}", err);
    }

    let store = db.snapshot()?;

    println!("\n3. Running a query...");
    let count = store
        .query("Event")?
        .equal_to("kind", "disk")?
        .greater_than_or_equal_to("severity", 4)?
        .count()?;
    println!("Found {} serious disk events", count);

    println!("\n4. Rejecting a predicate...");
    if let Err(err) = store.query("Event")?.begins_with("severity", "4") {
        println!("Rejected: {}", err);
    }

    println!("\n=== Demo Complete ===");
    println!("Check the logs above to see tracing output!");
    Ok(())
}
