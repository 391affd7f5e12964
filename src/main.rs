//! Bruter scripting runtime - CLI

use anyhow::{Context, Result};
use bruter::util::{config, logger};
use bruter::{
    check_arity, check_min_arity, run, run_file, Slot, SymbolTable, VMResult, Value,
    VirtualMachine, NAME, VERSION,
};
use clap::{ArgAction, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// A small embeddable scripting runtime
#[derive(Parser, Debug)]
#[command(name = "bruter")]
#[command(author = "Bruter Team")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// VM configuration file (RON)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a script file
    Run {
        /// Script file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Evaluate code from the command line
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Print version information
    Version,
}

/// `print a b ..`: evaluates every argument and prints them on one line
fn builtin_print(
    vm: &mut VirtualMachine,
    args: &[Slot],
    context: Option<&mut SymbolTable>,
) -> VMResult<Option<Slot>> {
    let values = vm.eval_args(args, context)?;
    let mut line = Vec::with_capacity(values.len());
    for slot in values {
        match vm.value(slot)? {
            Value::String(s) => line.push(s.clone()),
            _ => line.push(vm.stringify(slot)?),
        }
    }
    println!("{}", line.join(" "));
    Ok(None)
}

/// `add a b ..`: sum of numeric arguments
fn builtin_add(
    vm: &mut VirtualMachine,
    args: &[Slot],
    mut context: Option<&mut SymbolTable>,
) -> VMResult<Option<Slot>> {
    check_min_arity("add", args, 1)?;
    let mut sum = 0.0;
    for &arg in args {
        sum += vm.eval_number(arg, context.as_deref_mut())?;
    }
    Ok(Some(vm.new_number(sum)))
}

/// `set name value`: binds in the local context if there is one. A slot
/// the name was bound to before is released once nothing else reaches it.
fn builtin_set(
    vm: &mut VirtualMachine,
    args: &[Slot],
    mut context: Option<&mut SymbolTable>,
) -> VMResult<Option<Slot>> {
    check_arity("set", args, 2)?;
    let name = vm.expect_symbol(args[0])?.to_string();
    let value = vm.eval_arg(args[1], context.as_deref_mut())?;
    match context {
        Some(table) => {
            if let Some(previous) = table.set(&name, value) {
                release_unbound(vm, previous, Some(&*table));
            }
        }
        None => {
            if let Some(previous) = vm.hash_set(&name, value) {
                release_unbound(vm, previous, None);
            }
        }
    }
    Ok(Some(value))
}

/// Release `slot`, and the list items under it, unless still reachable
fn release_unbound(
    vm: &mut VirtualMachine,
    slot: Slot,
    context: Option<&SymbolTable>,
) {
    let mut pending = vec![slot];
    while let Some(slot) = pending.pop() {
        if vm.is_reachable(slot, context) {
            continue;
        }
        let items = match vm.value(slot) {
            Ok(Value::List(items)) => items.clone(),
            Ok(_) => Vec::new(),
            Err(_) => continue,
        };
        if vm.unuse_var(slot).is_ok() {
            pending.extend(items);
        }
    }
}

fn register_demo_builtins(vm: &mut VirtualMachine) {
    vm.register_builtin("print", builtin_print);
    vm.register_builtin("add", builtin_add);
    vm.register_builtin("set", builtin_set);
}

fn make_vm(config_path: Option<&PathBuf>) -> Result<VirtualMachine> {
    let path = config_path
        .cloned()
        .unwrap_or_else(config::default_config_path);
    let config = config::load_config(&path)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;

    let mut vm = VirtualMachine::with_config(config);
    register_demo_builtins(&mut vm);
    Ok(vm)
}

fn execute(args: Args) -> Result<()> {
    let result = match args.command {
        Commands::Run { file } => {
            let mut vm = make_vm(args.config.as_ref())?;
            run_file(&mut vm, &file).with_context(|| format!("Failed to run: {}", file.display()))?
        }
        Commands::Eval { code } => {
            let mut vm = make_vm(args.config.as_ref())?;
            run(&mut vm, &code).context("Failed to evaluate code")?
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
            None
        }
    };

    if let Some(text) = result {
        println!("{}", text);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    logger::init_with_level(logger::LogLevel::from_verbosity(args.verbose));

    if let Err(err) = execute(args) {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}
