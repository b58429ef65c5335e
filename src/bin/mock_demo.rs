//! Mock demo binary for integration testing
//!
//! Speaks the same command line and stdin/stdout contract as the GTK panzoom
//! and serialization demos, so the harness can be exercised without a display
//! or a GTK build. Instead of a perceptual hash of a rendered window, the
//! "digest" is a SHA-256 of the canonical builder models.
//!
//! `MOCK_DEMO_BEHAVIOR` injects faults:
//! - `drop:<field>`   omit a field from the echo
//! - `alter:<field>`  echo a different value for a field
//! - `null:<field>`   echo `null` for a field
//! - `extra-model`    also echo a nested model that was never sent
//! - `garbage`        print a non-JSON response
//! - `pretty`         pretty-print the echo over several lines
//! - `exit-early`     exit with code 4 before reading input
//! - `hang`           never exit after reading input

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::Path;

fn main() {
    let behavior = std::env::var("MOCK_DEMO_BEHAVIOR").unwrap_or_default();

    // The harness must neutralize session bus discovery
    match std::env::var("DBUS_SESSION_BUS_ADDRESS") {
        Ok(addr) if addr.is_empty() => {}
        _ => {
            eprintln!("ERROR: DBUS_SESSION_BUS_ADDRESS is not empty; would block on bus discovery");
            std::process::exit(3);
        }
    }

    if behavior == "exit-early" {
        std::process::exit(4);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = if args.iter().any(|a| a == "--ui") {
        run_panzoom(&args)
    } else {
        run_serialize(&args, &behavior)
    };

    if behavior == "hang" {
        std::thread::sleep(std::time::Duration::from_secs(600));
    }
    std::process::exit(code);
}

#[derive(Default)]
struct PanzoomOpts {
    input: Option<String>,
    ui: Option<String>,
    command: Option<String>,
    outfile: Option<String>,
    reference_hash: Option<String>,
}

fn run_panzoom(args: &[String]) -> i32 {
    let mut opts = PanzoomOpts::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-i" | "--input" => opts.input = iter.next().cloned(),
            "--ui" => opts.ui = iter.next().cloned(),
            "-o" | "--outfile" => opts.outfile = iter.next().cloned(),
            "--threshold" => {
                iter.next();
            }
            "test" | "hash" if opts.command.is_none() => opts.command = Some(arg.clone()),
            other => opts.reference_hash = Some(other.to_string()),
        }
    }

    let Some(ui) = opts.ui else {
        eprintln!("ERROR: --ui is required");
        return 1;
    };
    if !Path::new(&ui).is_file() {
        eprintln!("ERROR: Failed to load gladefile {}", ui);
        return 1;
    }

    let models = match opts.input.as_deref() {
        Some(input) => match read_models(input) {
            Ok(models) => models,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return 1;
            }
        },
        None => Map::new(),
    };

    let frame = serde_json::to_string(&models).unwrap_or_default();
    let digest = hex::encode(Sha256::digest(frame.as_bytes()));

    if let Some(outfile) = &opts.outfile {
        if let Err(e) = std::fs::write(outfile, frame.as_bytes()) {
            eprintln!("ERROR: Failed to write {}: {}", outfile, e);
            return 1;
        }
    }

    match opts.command.as_deref() {
        Some("hash") => {
            println!("{}", digest);
            0
        }
        Some("test") => {
            let reference = opts.reference_hash.unwrap_or_default();
            if reference.eq_ignore_ascii_case(&digest) {
                0
            } else {
                eprintln!("Rendered image does not match the reference hash");
                eprintln!("    Note: ref-hash=\"{}\"", reference);
                eprintln!("    Note: act-hash=\"{}\"", digest);
                1
            }
        }
        _ => {
            eprintln!("ERROR: expected 'test' or 'hash' command");
            1
        }
    }
}

fn run_serialize(args: &[String], behavior: &str) -> i32 {
    let mut input = None;
    let mut output = None;
    let mut glade = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-i" | "--input" => input = iter.next().cloned(),
            "-o" | "--output" => output = iter.next().cloned(),
            "-t" | "--test" => {}
            other => glade = Some(other.to_string()),
        }
    }

    let Some(glade) = glade else {
        eprintln!("ERROR: missing gladefile argument");
        return 1;
    };
    if !Path::new(&glade).is_file() {
        eprintln!("ERROR: Failed to load gladefile {}", glade);
        return 1;
    }

    let mut models = match input.as_deref() {
        Some(input) => match read_models(input) {
            Ok(models) => models,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return 1;
            }
        },
        None => Map::new(),
    };

    if let Some(field) = behavior.strip_prefix("drop:") {
        models.remove(field);
    }
    if let Some(field) = behavior.strip_prefix("alter:") {
        models.insert(field.to_string(), json!("altered"));
    }
    if let Some(field) = behavior.strip_prefix("null:") {
        models.insert(field.to_string(), Value::Null);
    }
    if behavior == "extra-model" {
        models.insert(
            "panzoom".to_string(),
            json!({"offset_x": 0.0, "offset_y": 0.0, "scale": 1.0}),
        );
    }

    if output.as_deref() != Some("-") {
        return 0;
    }

    let envelope = json!({ "builder_models": models });
    let text = match behavior {
        "garbage" => "this is not json".to_string(),
        "pretty" => serde_json::to_string_pretty(&envelope).unwrap_or_default(),
        _ => envelope.to_string(),
    };

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    writeln!(writer, "{}", text).ok();
    writer.flush().ok();
    0
}

/// Read the whole input until EOF and pull out `builder_models`
fn read_models(input: &str) -> Result<Map<String, Value>, String> {
    let mut content = String::new();
    if input == "-" {
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| format!("failed to read stdin: {}", e))?;
    } else {
        content = std::fs::read_to_string(input)
            .map_err(|e| format!("Can't read input file {}: {}", input, e))?;
    }

    let value: Value =
        serde_json::from_str(content.trim()).map_err(|e| format!("invalid JSON input: {}", e))?;
    match value.get("builder_models") {
        Some(Value::Object(models)) => Ok(models.clone()),
        _ => Err("input has no 'builder_models' object".to_string()),
    }
}
