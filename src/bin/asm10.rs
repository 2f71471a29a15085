//! Driver: per-argument orchestration of macro expansion, pass 1/2, and the
//! `.am`/`.ob`/`.ent`/`.ext` output files.
//!
//! Grounded on the teacher's `src/bin/assembler.rs`: a thin `main` that loops
//! over positional arguments, reads one input per iteration, and exits
//! non-zero only on the usage-message path (spec.md §6.1 / SPEC_FULL.md §4.10).

use std::fs;

use asm10::context;
use asm10::logging;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <base-name> [<base-name> ...]", args[0]);
        std::process::exit(1);
    }

    for base_name in &args[1..] {
        process_unit(base_name);
    }
}

fn process_unit(base_name: &str) {
    let input_path = format!("{}.as", base_name);
    let source = match fs::read_to_string(&input_path) {
        Ok(source) => source,
        Err(e) => {
            logging::error(format!("failed to read \"{}\": {}", input_path, e));
            return;
        }
    };

    let unit = context::assemble(&source);

    if unit.macro_phase_succeeded {
        let am_path = format!("{}.am", base_name);
        if let Err(e) = fs::write(&am_path, &unit.expanded_source) {
            logging::error(format!("failed to write \"{}\": {}", am_path, e));
        }
    }

    for warning in &unit.warnings {
        logging::warning(warning.to_string(), warning.line_number());
    }

    if unit.has_errors() {
        for error in &unit.errors {
            logging::error(error.to_string());
        }
        logging::unit_failed(base_name, unit.errors.len());
        return;
    }

    if let Some(object_file) = &unit.object_file {
        write_artifact(&format!("{}.ob", base_name), object_file);
    }
    if let Some(entries_file) = &unit.entries_file {
        write_artifact(&format!("{}.ent", base_name), entries_file);
    }
    if let Some(externals_file) = &unit.externals_file {
        write_artifact(&format!("{}.ext", base_name), externals_file);
    }
}

fn write_artifact(path: &str, contents: &str) {
    if let Err(e) = fs::write(path, contents) {
        logging::error(format!("failed to write \"{}\": {}", path, e));
    }
}
