//! `.arxmod` inspector: prints header, section and class-manifest
//! information for a module file.

use arx_mod::{ArxmodReader, SectionKind};

use std::process::ExitCode;

const USAGE: &str = "\
usage: arxmod <module.arxmod> [option]

options:
  -info       header summary (default)
  -sections   table of contents
  -classes    class manifest
  -validate   structural checks only
  -hex        hex dump of the data region
  -h, --help  this help
";

enum Command {
    Info,
    Sections,
    Classes,
    Validate,
    Hex,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    let mut path = None;
    let mut command = Command::Info;
    for arg in &args {
        match arg.as_str() {
            "-info" => command = Command::Info,
            "-sections" => command = Command::Sections,
            "-classes" => command = Command::Classes,
            "-validate" => command = Command::Validate,
            "-hex" => command = Command::Hex,
            flag if flag.starts_with('-') => {
                eprintln!("arxmod: unknown option {flag}");
                eprint!("{USAGE}");
                return ExitCode::FAILURE;
            }
            positional => {
                if path.replace(positional).is_some() {
                    eprintln!("arxmod: more than one module path given");
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    let Some(path) = path else {
        eprint!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let reader = match ArxmodReader::from_file(path) {
        Ok(reader) => reader,
        Err(err) => {
            eprintln!("arxmod: {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    match command {
        Command::Info => print_info(&reader),
        Command::Sections => print_sections(&reader),
        Command::Classes => print_classes(&reader),
        Command::Validate => {
            if let Err(err) = validate(&reader) {
                eprintln!("arxmod: {path}: {err}");
                return ExitCode::FAILURE;
            }
            println!("{path}: ok");
        }
        Command::Hex => print_hex(&reader),
    }

    ExitCode::SUCCESS
}

fn print_info(reader: &ArxmodReader) {
    let h = reader.header();
    let kind = if h.is_executable() {
        "executable"
    } else {
        "library"
    };

    println!("kind:        {kind}");
    println!("entry point: {}", h.entry_point);
    println!("toc:         {} bytes at {}", h.toc_size, h.toc_offset);
    println!("data:        {} bytes at {}", h.data_size, h.data_offset);

    match reader.app() {
        Ok(Some(app)) => {
            println!("app:         {} ({} payload bytes)", app.name, app.payload.len());
        }
        Ok(None) => {}
        Err(err) => println!("app:         <malformed: {err}>"),
    }
}

fn print_sections(reader: &ArxmodReader) {
    println!("{:<10} {:>10} {:>10}", "SECTION", "OFFSET", "SIZE");
    for entry in reader.toc() {
        println!(
            "{:<10} {:>10} {:>10}",
            entry.kind.name(),
            entry.offset,
            entry.size
        );
    }
}

fn print_classes(reader: &ArxmodReader) {
    let manifest = match reader.classes() {
        Ok(manifest) => manifest,
        Err(err) => {
            println!("<malformed CLASSES section: {err}>");
            return;
        }
    };

    if manifest.classes.is_empty() {
        println!("no classes");
        return;
    }

    for class in &manifest.classes {
        println!(
            "class {} (id {:#018x}, {} bytes/instance)",
            class.entry.name, class.entry.class_id, class.entry.instance_size
        );
        if class.entry.parent_class_id != 0 {
            println!("  extends {:#018x}", class.entry.parent_class_id);
        }
        for f in &class.fields {
            println!("  field  {:<20} offset {:>4}", f.name, f.offset);
        }
        for m in &class.methods {
            let ret = if m.return_type.is_empty() {
                String::new()
            } else {
                format!(": {}", m.return_type)
            };
            println!(
                "  method {}({}){ret:<12} offset {:>4}",
                m.name, m.param_types, m.offset
            );
        }
    }
}

fn validate(reader: &ArxmodReader) -> Result<(), arx_mod::LoadError> {
    reader.header().validate_flags()?;
    reader.code()?;
    reader.strings()?;
    reader.classes()?;
    reader.app()?;
    Ok(())
}

fn print_hex(reader: &ArxmodReader) {
    for kind in SectionKind::ALL {
        let Some(bytes) = reader.section(kind) else {
            continue;
        };
        if bytes.is_empty() {
            continue;
        }

        println!("{}:", kind.name());
        for (i, chunk) in bytes.chunks(16).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            println!("  {:08x}  {:<47}  {ascii}", i * 16, hex.join(" "));
        }
    }
}
