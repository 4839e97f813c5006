use anyhow::Result;
use rusqlite::Connection;
use std::env;

// Use library instead of local modules
use address_history::{
    insert_person, list_persons, segment_history, setup_database, Person,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("init") => run_init()?,
        Some("add-person") => run_add_person(&args[2..])?,
        Some("list-persons") => run_list_persons()?,
        Some("history") => run_history(&args[2..])?,
        _ => print_usage(),
    }

    Ok(())
}

fn db_path() -> String {
    env::var("ADDRESS_DB").unwrap_or_else(|_| "addresses.db".to_string())
}

fn open_db() -> Result<Connection> {
    let path = db_path();
    let conn = Connection::open(&path)?;
    setup_database(&conn)?;
    Ok(conn)
}

fn print_usage() {
    println!("Address History Service");
    println!();
    println!("Usage:");
    println!("  address-history init                        initialize the database");
    println!("  address-history add-person <first> <last>   create a person, print their id");
    println!("  address-history list-persons                list known persons");
    println!("  address-history history <person-id>         print a person's address timeline");
    println!();
    println!("Database path comes from ADDRESS_DB (default: addresses.db)");
    println!("Run the HTTP server with: cargo run --bin address-server --features server");
}

fn run_init() -> Result<()> {
    let path = db_path();
    let conn = Connection::open(&path)?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode: {}", path);
    Ok(())
}

fn run_add_person(args: &[String]) -> Result<()> {
    let (first, last) = match args {
        [first, last] => (first, last),
        _ => {
            eprintln!("Usage: address-history add-person <first> <last>");
            std::process::exit(1);
        }
    };

    let conn = open_db()?;
    let person = Person::new(first, last);
    insert_person(&conn, &person)?;

    println!("✓ Created person {} {}", person.first_name, person.last_name);
    println!("  id: {}", person.id);
    Ok(())
}

fn run_list_persons() -> Result<()> {
    let conn = open_db()?;
    let persons = list_persons(&conn)?;

    if persons.is_empty() {
        println!("No persons yet. Create one with: address-history add-person <first> <last>");
        return Ok(());
    }

    for person in &persons {
        println!("{}  {} {}", person.id, person.first_name, person.last_name);
    }
    println!("✓ {} persons", persons.len());
    Ok(())
}

fn run_history(args: &[String]) -> Result<()> {
    let person_id = match args.first().map(|s| s.parse()) {
        Some(Ok(id)) => id,
        _ => {
            eprintln!("Usage: address-history history <person-id>");
            std::process::exit(1);
        }
    };

    let conn = open_db()?;
    let segments = segment_history(&conn, person_id)?;

    if segments.is_empty() {
        println!("No address segments on file for {}", person_id);
        return Ok(());
    }

    for segment in &segments {
        let end = segment
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "current".to_string());
        println!(
            "{} → {}  {}, {}, {} {}",
            segment.start_date, end, segment.street_one, segment.city, segment.state,
            segment.zip_code
        );
    }
    println!("✓ {} segments", segments.len());
    Ok(())
}
