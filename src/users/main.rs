use std::fs::create_dir_all;
use std::path::PathBuf;
use std::process;

use clap::{
    App,
    Arg,
};
use env_logger;
use rpassword::prompt_password;

use hashdrop::db::{
    Database,
    StoreError,
};
use hashdrop::state::db_path;
use hashdrop::user::{
    User,
    DEFAULT_COST,
};

use log::{debug, error};

fn prompt(s: &str) -> String {
    match prompt_password(s) {
        Ok(v) => v,
        Err(e) => {
            error!("cannot read secret: {}", e);
            process::exit(1);
        },
    }
}

fn main() {
    env_logger::init();

    let mut o = App::new("hashdrop_users");
    o = o.version(env!("CARGO_PKG_VERSION"));
    o = o.about("Manage hashdrop users");

    o = o.arg(Arg::with_name("NAME")
              .required(true)
              );

    o = o.arg(Arg::with_name("storedir")
              .short("s")
              .long("storedir")
              .value_name("DIR")
              .help("Directory to use as storage")
              .takes_value(true)
              .default_value("store")
              );

    o = o.arg(Arg::with_name("create")
              .long("create")
              .help("Create user if non-existant")
              );

    o = o.arg(Arg::with_name("pass")
              .long("pass")
              .help("Set secret")
              );

    o = o.arg(Arg::with_name("cost")
              .long("cost")
              .value_name("COST")
              .help("bcrypt work factor for the new secret")
              .takes_value(true)
              );

    let args = o.get_matches();

    let name = args.value_of("NAME").unwrap_or_default();
    let storage_dir = PathBuf::from(args.value_of("storedir").unwrap_or("store"));
    let cost = match args.value_of("cost").map(|v| v.parse::<u32>()) {
        None => DEFAULT_COST,
        Some(Ok(v)) => v,
        Some(Err(e)) => {
            error!("invalid cost: {}", e);
            process::exit(1);
        },
    };

    let path = db_path(&storage_dir);
    if let Some(db_dir) = path.parent() {
        if let Err(e) = create_dir_all(db_dir) {
            error!("unable to create database directory {:?}: {}", db_dir, e);
            process::exit(1);
        }
    }
    let db = match Database::open(&path) {
        Ok(v) => v,
        Err(e) if e.is_locked() => {
            error!("database {:?} is in use, stop the server first", &path);
            process::exit(1);
        },
        Err(e) => {
            error!("unable to open database: {}", e);
            process::exit(1);
        },
    };

    let mut user = match db.user(name) {
        Ok(v) => {
            println!("Loaded user {}", &v.name);
            v
        },
        Err(StoreError::NoUser) if args.is_present("create") => {
            let v = User::new(name);
            println!("Created new user: {}", &v.name);
            v
        },
        Err(StoreError::NoUser) => {
            println!("Unknown user: {}", name);
            return;
        },
        Err(e) => {
            error!("cannot load user: {}", e);
            process::exit(1);
        },
    };

    if args.is_present("pass") {
        let current = if user.has_secret() {
            prompt("Enter current secret: ")
        } else {
            String::new()
        };
        let new = prompt("Enter new secret: ");
        let again = prompt("Enter new secret again: ");
        if new != again {
            println!("New secrets did not match");
            process::exit(1);
        }
        if let Err(e) = user.set_secret(&current, &new, cost) {
            println!("Failed to set secret for user {}: {}", &user.name, e);
            process::exit(1);
        }
        println!("Successfully set new secret for user {}", &user.name);
    }

    if let Err(e) = db.save_user(&user) {
        println!("Failed to save user {}: {}", &user.name, e);
        process::exit(1);
    }
    debug!("saved user {}", &user.name);
}
