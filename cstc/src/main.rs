//! The `cstc` command line: check a C* file and everything it imports,
//! or drop into the REPL when no file is given.
//!
//! Exit status: 0 clean, 1 bad arguments (clap), 2 errors found (or
//! warnings under `--punish`), 3 main file not found.

use clap::Parser;
use cstar_lang::parse::Ctx;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "cstc", version, about = "C* compiler front end")]
struct Args {
    /// The file to check; without it the REPL starts.
    file: Option<PathBuf>,

    /// List every loaded module in dependency order.
    #[arg(short = 'l', long = "list-modules")]
    list_modules: bool,

    /// Stop at the first error instead of recovering.
    #[arg(short = '1', long = "one-error")]
    one_error: bool,

    /// Treat warnings as errors for the exit status.
    #[arg(short = 'p', long = "punish")]
    punish: bool,

    /// Warn about source lines longer than this many characters.
    #[arg(long = "max-line-len", default_value_t = 100)]
    max_line_len: usize,

    /// Do not auto-include the `lang` standard module.
    #[arg(long = "no-std-lang")]
    no_std_lang: bool,

    /// Fold constant expressions while parsing.
    #[arg(long = "fold", default_value_t = true, overrides_with = "no_fold")]
    fold: bool,

    /// Disable constant folding.
    #[arg(long = "no-fold")]
    no_fold: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    cstar_lang::set_exit_on_first_error(args.one_error);
    cstar_lang::set_punish(args.punish);
    cstar_lang::set_max_line_len(args.max_line_len);
    cstar_lang::set_folding(args.fold && !args.no_fold);
    cstar_lang::report::install_render_hook();

    if !args.no_std_lang && std::env::var_os("CSTC_STD").is_none() {
        eprintln!("warning: CSTC_STD is not set, no standard library will be found");
    }

    let Some(file) = args.file else {
        return match cstar_lang::repl::main_loop() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("repl error: {}", err);
                ExitCode::from(2)
            }
        };
    };

    let mut ctx = Ctx::new();
    let (graph, found) = cstar_lang::check_file(&file, args.no_std_lang, &mut ctx);
    if !found {
        eprintln!("error: cannot read '{}'", file.display());
        return ExitCode::from(3);
    }

    if args.list_modules {
        for module in graph.modules() {
            println!("{}  {}", module.name, module.path.display());
        }
    }

    ctx.reporter.print_summary();
    let failed =
        ctx.reporter.has_errors() || (cstar_lang::punish() && ctx.reporter.warning_count() > 0);
    if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
