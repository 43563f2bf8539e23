//! Forge Driver
//!
//! Command-line entry point for the Forge assembly-generation backend.
//! Provides built-in demo programs for exercising a backend, assembly
//! generation from IR modules stored as JSON, and a listing of the
//! architectures the info table knows about.

use clap::{Parser, Subcommand};
use forge_backend::{create_backend, CpuModel, ARCH_INFO};
use forge_common::Arch;
use forge_ir::{
    GlobalInit, GlobalVariable, Instruction, IrBinaryOp, IrBuilder, IrCmpOp, IrType, Module, Value,
};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Forge retargetable assembly generator")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate assembly for a built-in demo program
    Demo {
        /// Which demo to build: sum, bits, or hello
        #[arg(short, long, default_value = "sum")]
        name: String,

        /// Target architecture
        #[arg(long, default_value = "ppc64")]
        arch: String,

        /// CPU model to tune for
        #[arg(long, default_value = "generic")]
        cpu: String,

        /// Output file for generated assembly (stdout if absent)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the IR before generating assembly
        #[arg(long)]
        print_ir: bool,

        /// Save the IR module as JSON
        #[arg(long)]
        ir_output: Option<PathBuf>,
    },

    /// Generate assembly from an IR module stored as JSON
    Generate {
        /// Input IR module (JSON)
        input: PathBuf,

        /// Target architecture
        #[arg(long, default_value = "ppc64")]
        arch: String,

        /// CPU model to tune for
        #[arg(long, default_value = "generic")]
        cpu: String,

        /// Output assembly file (stdout if absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the architectures in the info table
    Targets,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Demo { name, arch, cpu, output, print_ir, ir_output } => run_demo(
            &name,
            &arch,
            &cpu,
            output.as_deref(),
            print_ir,
            ir_output.as_deref(),
        ),
        Commands::Generate { input, arch, cpu, output } => {
            run_generate(&input, &arch, &cpu, output.as_deref())
        }
        Commands::Targets => {
            print_targets();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_target(arch: &str, cpu: &str) -> Result<(Arch, CpuModel), String> {
    let arch = Arch::from_name(arch).ok_or_else(|| format!("unknown architecture: {arch}"))?;
    let cpu = CpuModel::from_name(cpu).ok_or_else(|| format!("unknown CPU model: {cpu}"))?;
    Ok((arch, cpu))
}

fn run_demo(
    name: &str,
    arch: &str,
    cpu: &str,
    output: Option<&Path>,
    print_ir: bool,
    ir_output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let module = match name {
        "sum" => demo_sum(),
        "bits" => demo_bits(),
        "hello" => demo_hello(),
        other => return Err(format!("unknown demo: {other}").into()),
    };

    if print_ir {
        print_module_ir(&module);
    }
    if let Some(path) = ir_output {
        fs::write(path, serde_json::to_string_pretty(&module)?)?;
        info!("wrote IR module to {}", path.display());
    }

    emit(&module, arch, cpu, output)
}

fn run_generate(
    input: &Path,
    arch: &str,
    cpu: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = fs::read_to_string(input)?;
    let module: Module = serde_json::from_str(&text)?;
    info!(
        "loaded module {} from {}",
        module.name,
        input.display()
    );
    emit(&module, arch, cpu, output)
}

fn emit(
    module: &Module,
    arch: &str,
    cpu: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (arch, cpu) = parse_target(arch, cpu)?;
    let mut backend = create_backend(arch, cpu)?;
    let asm = backend.codegen_module(module)?;
    match output {
        Some(path) => {
            fs::write(path, &asm)?;
            println!("Wrote {} to {}", module.name, path.display());
        }
        None => print!("{asm}"),
    }
    Ok(())
}

fn print_targets() {
    println!(
        "{:<8} {:>4} {:>5}  {:<7} {:>5} {:>5}",
        "arch", "ptr", "bits", "endian", "gprs", "fprs"
    );
    for info in &ARCH_INFO {
        println!(
            "{:<8} {:>4} {:>5}  {:<7} {:>5} {:>5}",
            info.arch.name(),
            info.pointer_size,
            info.address_bits,
            info.endianness.to_string(),
            info.gpr_count,
            info.fpr_count
        );
    }
}

fn print_module_ir(module: &Module) {
    println!("module {}", module.name);
    for global in &module.globals {
        println!("  global {}: {}", global.name, global.ty);
    }
    for func in &module.functions {
        if func.is_external {
            println!("  extern fn {}", func.name);
            continue;
        }
        println!("  fn {} ({} params)", func.name, func.params.len());
        for block in &func.blocks {
            println!("  block{} ({}):", block.id, block.name);
            for instruction in &block.instructions {
                println!("    {instruction}");
            }
        }
    }
}

/// Counting loop: sums 1..=n with a phi-carried accumulator and an
/// alloca-backed loop index.
fn demo_sum() -> Module {
    let mut b = IrBuilder::new();
    b.create_function("sum_below", vec![IrType::I64], IrType::I64);
    let entry = b.create_block("entry").unwrap();
    let cond = b.create_block("cond").unwrap();
    let body = b.create_block("body").unwrap();
    let end = b.create_block("end").unwrap();

    b.switch_to_block(entry).unwrap();
    let slot = b.build_alloca(IrType::I64).unwrap();
    b.build_store(Value::Constant(0), Value::Temp(slot), IrType::I64)
        .unwrap();
    b.build_br(cond).unwrap();

    b.switch_to_block(body).unwrap();
    let i = b.build_load(Value::Temp(slot), IrType::I64).unwrap();
    let i_next = b
        .build_binary(IrBinaryOp::Add, Value::Constant(1), Value::Temp(i), IrType::I64)
        .unwrap();
    b.build_store(Value::Temp(i_next), Value::Temp(slot), IrType::I64)
        .unwrap();

    b.switch_to_block(cond).unwrap();
    let acc = b
        .build_phi(vec![(Value::Constant(0), entry)], IrType::I64)
        .unwrap();
    let current = b.build_load(Value::Temp(slot), IrType::I64).unwrap();
    let more = b
        .build_cmp(IrCmpOp::Slt, Value::Temp(current), Value::Param(0))
        .unwrap();
    b.build_br_cond(Value::Temp(more), body, end).unwrap();

    b.switch_to_block(body).unwrap();
    let acc_next = b
        .build_binary(IrBinaryOp::Add, Value::Temp(acc), Value::Temp(i_next), IrType::I64)
        .unwrap();
    b.build_br(cond).unwrap();

    b.switch_to_block(end).unwrap();
    b.build_ret(Some(Value::Temp(acc))).unwrap();

    let mut func = b.finish_function().unwrap();
    let cond_block = func.get_block_mut(cond).unwrap();
    if let Instruction::Phi { incoming, .. } = &mut cond_block.instructions[0] {
        incoming.push((Value::Temp(acc_next), body));
    }

    let mut module = Module::new("demo_sum");
    module.add_function(func);
    module
}

/// Bit-manipulation showcase: one small function per operation that has
/// both a native and an emulated lowering.
fn demo_bits() -> Module {
    let mut module = Module::new("demo_bits");
    let mut b = IrBuilder::new();

    b.create_function("popcount_word", vec![IrType::I64], IrType::I64);
    b.create_block("entry").unwrap();
    let ones = b.build_popcnt(Value::Param(0)).unwrap();
    b.build_ret(Some(Value::Temp(ones))).unwrap();
    module.add_function(b.finish_function().unwrap());

    b.create_function("reverse_bytes", vec![IrType::I64], IrType::I64);
    b.create_block("entry").unwrap();
    let swapped = b.build_bswap(Value::Param(0), 64).unwrap();
    b.build_ret(Some(Value::Temp(swapped))).unwrap();
    module.add_function(b.finish_function().unwrap());

    b.create_function("equal_bytes", vec![IrType::I64, IrType::I64], IrType::I64);
    b.create_block("entry").unwrap();
    let mask = b.build_bytecmp(Value::Param(0), Value::Param(1)).unwrap();
    b.build_ret(Some(Value::Temp(mask))).unwrap();
    module.add_function(b.finish_function().unwrap());

    b.create_function("pick", vec![IrType::I64, IrType::I64], IrType::I64);
    b.create_block("entry").unwrap();
    let chosen = b
        .build_select(Value::Param(0), Value::Param(1), Value::Constant(-1))
        .unwrap();
    b.build_ret(Some(Value::Temp(chosen))).unwrap();
    module.add_function(b.finish_function().unwrap());

    module
}

/// Classic greeting plus a global counter bump through the TOC.
fn demo_hello() -> Module {
    let mut module = Module::new("demo_hello");
    module.add_global(GlobalVariable {
        name: "greeting_count".into(),
        ty: IrType::I64,
        init: GlobalInit::Scalar(0),
    });
    module.add_function(forge_ir::Function::external(
        "puts",
        vec![IrType::Ptr],
        IrType::I32,
    ));

    let mut b = IrBuilder::new();
    b.create_function("main", vec![], IrType::I64);
    b.create_block("entry").unwrap();
    b.build_call(
        Value::Function("puts".into()),
        vec![Value::ConstantString("hello from forge".into())],
        true,
    )
    .unwrap();
    let count = b
        .build_load(Value::Global("greeting_count".into()), IrType::I64)
        .unwrap();
    let bumped = b
        .build_binary(IrBinaryOp::Add, Value::Constant(1), Value::Temp(count), IrType::I64)
        .unwrap();
    b.build_store(
        Value::Temp(bumped),
        Value::Global("greeting_count".into()),
        IrType::I64,
    )
    .unwrap();
    b.build_ret(Some(Value::Constant(0))).unwrap();
    module.add_function(b.finish_function().unwrap());
    module
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_modules_generate_for_every_cpu_model() {
        for module in [demo_sum(), demo_bits(), demo_hello()] {
            for cpu in ["generic", "power5", "power7", "power9"] {
                let (arch, cpu) = parse_target("ppc64", cpu).unwrap();
                let mut backend = create_backend(arch, cpu).unwrap();
                let asm = backend.codegen_module(&module).unwrap();
                assert!(asm.contains(".abiversion 1"));
            }
        }
    }

    #[test]
    fn test_demo_module_round_trips_through_json() {
        let module = demo_sum();
        let json = serde_json::to_string(&module).unwrap();
        let back: Module = serde_json::from_str(&json).unwrap();
        assert_eq!(back, module);

        let mut backend = create_backend(Arch::Ppc64, CpuModel::Power9).unwrap();
        assert_eq!(
            backend.codegen_module(&back).unwrap(),
            backend.codegen_module(&module).unwrap()
        );
    }

    #[test]
    fn test_parse_target_rejects_unknown_names() {
        assert!(parse_target("vax", "generic").is_err());
        assert!(parse_target("ppc64", "power10").is_err());
        assert!(parse_target("ppc64", "power6").is_ok());
    }
}
