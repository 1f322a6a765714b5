//! ARX virtual machine runner.

use arx_vm::{Interpreter, ModuleImage, VmParams};

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

const USAGE: &str = "\
usage: arxvm <module.arxmod> [options]

options:
  -debug      print a state summary after termination
  -trace      print each executed instruction to stderr
  -dump       print the module disassembly and exit
  -step       single-step, printing pc and stack depth
  -o <file>   write program output to a file instead of stdout
  -h, --help  this help
";

#[derive(Default)]
struct Options {
    path: Option<String>,
    debug: bool,
    trace: bool,
    dump: bool,
    step: bool,
    output: Option<String>,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-debug" => options.debug = true,
            "-trace" => options.trace = true,
            "-dump" => options.dump = true,
            "-step" => options.step = true,
            "-o" => {
                options.output =
                    Some(args.next().ok_or("-o expects a file path".to_string())?);
            }
            "-h" | "--help" => return Err(String::new()),
            flag if flag.starts_with('-') => {
                return Err(format!("unknown option {flag}"));
            }
            positional => {
                if options.path.replace(positional.to_string()).is_some() {
                    return Err("more than one module path given".to_string());
                }
            }
        }
    }

    if options.path.is_none() {
        return Err(String::new());
    }
    Ok(options)
}

fn main() -> ExitCode {
    let options = match parse_args() {
        Ok(options) => options,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("arxvm: {message}");
            }
            eprint!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };
    let path = options.path.as_deref().unwrap_or_default();

    let image = match ModuleImage::from_file(path) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("arxvm: {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    if options.dump {
        dump(&image);
        return ExitCode::SUCCESS;
    }

    let output: Box<dyn Write> = match &options.output {
        Some(file) => match File::create(file) {
            Ok(file) => Box::new(BufWriter::new(file)),
            Err(err) => {
                eprintln!("arxvm: {file}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(io::stdout()),
    };

    let params = VmParams {
        trace: options.trace,
        ..VmParams::default()
    };
    let stdin = io::stdin();
    let mut vm = match Interpreter::new(image, params, stdin.lock(), output) {
        Ok(vm) => vm,
        Err(fault) => {
            eprintln!("arxvm: {path}: {fault}");
            return ExitCode::FAILURE;
        }
    };

    let result = if options.trace || options.step {
        run_stepwise(&mut vm, options.step)
    } else {
        vm.run().map(|_| ())
    };

    if options.debug {
        print_summary(&vm);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(fault) => {
            eprintln!("arxvm: fault: {fault}");
            ExitCode::FAILURE
        }
    }
}

fn run_stepwise(
    vm: &mut Interpreter<io::StdinLock<'_>, Box<dyn Write>>,
    step_mode: bool,
) -> Result<(), arx_vm::VmFault> {
    if vm.is_library() {
        return vm.run().map(|_| ());
    }

    while !vm.state().is_terminal() {
        let pc = vm.pc();
        if let Some(ins) = vm.instructions().get(pc) {
            if step_mode {
                eprintln!("[{pc:>5}] {ins}  (stack depth {})", vm.stack().len());
            } else {
                eprintln!("[{pc:>5}] {ins}");
            }
        }
        vm.step()?;
    }
    Ok(())
}

fn print_summary<R: io::BufRead, W: Write>(vm: &Interpreter<R, W>) {
    eprintln!("state:   {:?}", vm.state());
    eprintln!("steps:   {}", vm.steps());
    eprintln!("pc:      {}", vm.pc());
    eprintln!("stack:   {} slots", vm.stack().len());
    eprintln!("frames:  {}", vm.frames().len());
    let alive = vm
        .objects()
        .entries()
        .iter()
        .filter(|e| e.is_alive)
        .count();
    eprintln!(
        "objects: {} alive of {} allocated, {} slots freed",
        alive,
        vm.objects().entries().len(),
        vm.objects().total_freed()
    );
}

fn dump(image: &ModuleImage) {
    let kind = if image.is_library() {
        "library"
    } else {
        "executable"
    };
    println!("{kind}, entry point {}", image.header.entry_point);

    println!("\ncode:");
    for (pc, ins) in image.instructions.iter().enumerate() {
        println!("  [{pc:>5}] {ins}");
    }

    if !image.strings.is_empty() {
        println!("\nstrings:");
        for (id, s) in image.strings.iter().enumerate() {
            println!("  [{id:>5}] {s:?}");
        }
    }

    if !image.registry.is_empty() {
        println!("\nclasses:");
        for class in image.registry.classes() {
            println!("  {} ({} fields)", class.entry.name, class.fields.len());
            for method in &class.methods {
                println!("    {} at {}", method.name, method.offset);
            }
        }
    }
}
