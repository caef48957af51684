
#[macro_use]
extern crate tracing;

use xmlable::{
    Serializer,
    ToValue,
    Xmlable,
};
use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env,
    io,
    path::PathBuf,
};
use tracing_subscriber::{
    fmt::{
        self,
        time::uptime,
    },
    prelude::*,
    Registry,
    EnvFilter,
};


/// Default logging environment filter. Our crate is debug, everything else is warn.
const DEFAULT_FILTER: &'static str = "warn,xmlable=debug,xmlable_demo=debug";

/// Initializes a `tracing` logging backend which outputs to stderr, so that
/// stdout stays clean for documents. Accepts `RUST_LOG` env filters on top of
/// the default.
fn init_logging() -> Result<()> {
    let format = fmt::format()
        .compact()
        .with_timer(uptime())
        .with_line_number(true);
    let stderr_log = fmt::layer()
        .event_format(format)
        .with_writer(io::stderr);

    let mut filter = DEFAULT_FILTER.to_owned();
    if let Ok(env_filter) = env::var(EnvFilter::DEFAULT_ENV) {
        filter.push(',');
        filter.push_str(&env_filter);
    }

    let subscriber = Registry::default()
        .with(EnvFilter::new(filter))
        .with(stderr_log);
    tracing::subscriber::set_global_default(subscriber)
        .context("unable to install log subscriber")?;
    Ok(())
}


#[derive(Xmlable)]
struct Student {
    #[xml(type = "String", name = "firstName")]
    first_name: Option<String>,
    #[xml(type = "String", name = "lastName")]
    last_name: Option<String>,
    #[xml(type = "int")]
    age: u32,
}

#[derive(Xmlable)]
struct Product {
    #[xml(type = "String", name = "productname")]
    name: String,
    #[xml(type = "double")]
    price: f64,
}

#[derive(Xmlable)]
struct User {
    #[xml(type = "String")]
    id: String,
    #[xml(type = "Product")]
    products: Vec<Product>,
}

#[derive(Xmlable)]
struct Address {
    #[xml(type = "String", name = "streetname")]
    street: String,
    #[xml(type = "String", name = "postalcode")]
    zip_code: String,
    #[xml(type = "String")]
    city: String,
    #[xml(type = "int")]
    number: i32,
}

#[derive(Xmlable)]
struct Person {
    #[xml(type = "String")]
    name: String,
    #[xml(type = "String")]
    surname: String,
    #[xml(type = "Address")]
    address: Address,
}

fn product(name: &str, price: f64) -> Product {
    Product {
        name: name.to_owned(),
        price,
    }
}

fn person(name: &str, surname: &str, address: Address) -> Person {
    Person {
        name: name.to_owned(),
        surname: surname.to_owned(),
        address,
    }
}

fn address(street: &str, zip_code: &str, city: &str, number: i32) -> Address {
    Address {
        street: street.to_owned(),
        zip_code: zip_code.to_owned(),
        city: city.to_owned(),
        number,
    }
}


fn main() -> Result<()> {
    init_logging()?;

    let out_dir = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    info!(out_dir = %out_dir.display(), "writing example documents");
    let mut serializer = Serializer::new();

    // objects of different types, one of them not xmlable
    let nobody = Student {
        first_name: None,
        last_name: None,
        age: 0,
    };
    let jane = Student {
        first_name: Some("Jane".to_owned()),
        last_name: Some("Doe".to_owned()),
        age: 42,
    };
    let mut grades = HashMap::new();
    grades.insert("Logic".to_owned(), 30);
    let path = serializer
        .serialize_to_path(
            &[nobody.to_value(), jane.to_value(), grades.to_value()],
            out_dir.join("multiple_objects"),
        )
        .context("serializing multiple objects")?;
    info!(path = %path.display(), "wrote document");

    // objects holding arrays of objects
    let users = [
        User {
            id: "001".to_owned(),
            products: vec![product("Wine", 11.4), product("Pizza", 5.9)],
        },
        User {
            id: "002".to_owned(),
            products: Vec::new(),
        },
        User {
            id: "001".to_owned(),
            products: vec![product("Apple", 1.0), product("Eggs", 1.75), product("Ham", 0.75)],
        },
    ];
    let values = users.iter().map(ToValue::to_value).collect::<Vec<_>>();
    let path = serializer
        .serialize_to_path(&values, out_dir.join("objects_with_array_of_objects"))
        .context("serializing objects with array of objects")?;
    info!(path = %path.display(), "wrote document");

    // objects holding objects
    let persons = [
        person("Giulio", "Cesare", address("Piazza del Colosseo", "00184", "Roma", 1)),
        person("Alan", "Turing", address("High Street", "SK9 1AX", "Wilmslow", 78)),
        person("Rino", "Gaetano", address("Viale Cristoforo Colombo", "88900", "Crotone", 117)),
    ];
    let values = persons.iter().map(ToValue::to_value).collect::<Vec<_>>();
    let path = serializer
        .serialize_to_path(&values, out_dir.join("recursive_serialization"))
        .context("serializing recursive objects")?;
    info!(path = %path.display(), "wrote document");

    println!("{}", serializer.serialize_to_string(&values)?);

    let summaries = [
        Student::schema().summary(),
        Product::schema().summary(),
        User::schema().summary(),
        Address::schema().summary(),
        Person::schema().summary(),
    ];
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}
