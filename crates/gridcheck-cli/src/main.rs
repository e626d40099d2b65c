//! gridcheck command-line harness.
//!
//! Each subcommand generates seeded random operands, runs one parallel
//! kernel on the selected device, verifies the result against the
//! sequential host oracle, and reports `Correct` or `Error`. The process
//! exits non-zero on verification failure and on any infrastructure error.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gridcheck_common::{Element, MatrixProblem};
use gridcheck_kernels::harness::RunReport;
use gridcheck_kernels::{
    probe, run_matmul, run_matrix_add, run_vector_add, select_device, DeviceChoice, DeviceContext,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Parallel kernel harness with host-side verification.
#[derive(Parser)]
#[command(name = "gridcheck", version)]
#[command(about = "Run parallel numeric kernels and verify them against a sequential oracle")]
struct Cli {
    /// Element type for operands and result.
    #[arg(long, value_enum, default_value_t = Dtype::F32, global = true)]
    dtype: Dtype,

    /// Execution device.
    #[arg(long, value_enum, default_value_t = Device::Auto, global = true)]
    device: Device,

    /// Seed for operand generation.
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Absolute tolerance for floating-point verification.
    #[arg(long, default_value_t = 1e-5, global = true)]
    tolerance: f64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Elementwise addition of two vectors.
    VectorAdd {
        /// Vector length.
        len: usize,
        /// Units per execution group.
        #[arg(long, default_value_t = 256)]
        group_size: u32,
    },
    /// Elementwise addition of two matrices.
    MatrixAdd {
        /// Matrix rows.
        rows: usize,
        /// Matrix columns.
        cols: usize,
        /// Side of the square execution group.
        #[arg(long, default_value_t = 16)]
        group_size: u32,
    },
    /// Matrix multiplication `C = A · B`.
    #[command(alias = "matmul")]
    MatrixMul {
        /// Rows of A.
        a_rows: usize,
        /// Columns of A.
        a_cols: usize,
        /// Rows of B (must equal columns of A).
        b_rows: usize,
        /// Columns of B.
        b_cols: usize,
        /// Side of the square execution group (power of two).
        #[arg(long, default_value_t = 16)]
        group_size: u32,
    },
    /// Show accelerator availability.
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Dtype {
    F32,
    F64,
    I32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Device {
    Cpu,
    Cuda,
    Auto,
}

impl From<Device> for DeviceChoice {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => DeviceChoice::Cpu,
            Device::Cuda => DeviceChoice::Cuda,
            Device::Auto => DeviceChoice::Auto,
        }
    }
}

/// Elements the CLI can fill with seeded random data.
trait GenElement: Element {
    fn sample(rng: &mut StdRng) -> Self;
}

impl GenElement for f32 {
    fn sample(rng: &mut StdRng) -> Self {
        rng.gen_range(-1.0..1.0)
    }
}

impl GenElement for f64 {
    fn sample(rng: &mut StdRng) -> Self {
        rng.gen_range(-1.0..1.0)
    }
}

impl GenElement for i32 {
    fn sample(rng: &mut StdRng) -> Self {
        rng.gen_range(-100..100)
    }
}

fn random_operand<E: GenElement>(rng: &mut StdRng, len: usize) -> Vec<E> {
    (0..len).map(|_| E::sample(rng)).collect()
}

fn run_command<E: GenElement>(
    device: &dyn DeviceContext,
    command: &Commands,
    seed: u64,
    tolerance: f64,
) -> Result<RunReport> {
    let mut rng = StdRng::seed_from_u64(seed);
    // Integer verification is always exact.
    let tolerance = if E::ELEMENT_TYPE == gridcheck_common::ElementType::I32 { 0.0 } else { tolerance };

    let report = match *command {
        Commands::VectorAdd { len, group_size } => {
            let a = random_operand::<E>(&mut rng, len);
            let b = random_operand::<E>(&mut rng, len);
            run_vector_add(device, &a, &b, group_size, tolerance)
        }
        Commands::MatrixAdd { rows, cols, group_size } => {
            let shape = MatrixProblem::new(rows, cols).context("invalid matrix shape")?;
            let a = random_operand::<E>(&mut rng, shape.len());
            let b = random_operand::<E>(&mut rng, shape.len());
            run_matrix_add(device, &a, &b, shape, group_size, tolerance)
        }
        Commands::MatrixMul { a_rows, a_cols, b_rows, b_cols, group_size } => {
            let a_shape = MatrixProblem::new(a_rows, a_cols).context("invalid A shape")?;
            let b_shape = MatrixProblem::new(b_rows, b_cols).context("invalid B shape")?;
            let a = random_operand::<E>(&mut rng, a_shape.len());
            let b = random_operand::<E>(&mut rng, b_shape.len());
            run_matmul(device, &a, a_shape, &b, b_shape, group_size, tolerance)
        }
        Commands::Info => unreachable!("handled before device work"),
    };
    report.context("kernel run failed")
}

fn report_outcome(report: &RunReport) -> bool {
    info!(
        op = report.op,
        device = %report.device,
        groups_x = report.geometry.groups.x,
        groups_y = report.geometry.groups.y,
        group_x = report.geometry.group.x,
        group_y = report.geometry.group.y,
        elements = report.elements,
        "run complete"
    );
    if report.passed {
        println!("Correct");
        true
    } else {
        match &report.mismatch {
            Some(m) => eprintln!(
                "Error: mismatch at index {}: computed {}, expected {}",
                m.index, m.computed, m.expected
            ),
            None => eprintln!("Error"),
        }
        false
    }
}

fn run(cli: &Cli) -> Result<bool> {
    if matches!(cli.command, Commands::Info) {
        println!("{}", probe::detect().summary());
        return Ok(true);
    }

    let device = select_device(cli.device.into()).context("device selection failed")?;
    let dtype = match cli.dtype {
        Dtype::F32 => "f32",
        Dtype::F64 => "f64",
        Dtype::I32 => "i32",
    };
    info!(device = device.name(), dtype, "starting run");

    let report = match cli.dtype {
        Dtype::F32 => run_command::<f32>(device.as_ref(), &cli.command, cli.seed, cli.tolerance)?,
        Dtype::F64 => run_command::<f64>(device.as_ref(), &cli.command, cli.seed, cli.tolerance)?,
        Dtype::I32 => run_command::<i32>(device.as_ref(), &cli.command, cli.seed, cli.tolerance)?,
    };
    Ok(report_outcome(&report))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn vector_add_args_parse() {
        let cli = Cli::parse_from(["gridcheck", "vector-add", "1024", "--group-size", "128"]);
        match cli.command {
            Commands::VectorAdd { len, group_size } => {
                assert_eq!(len, 1024);
                assert_eq!(group_size, 128);
            }
            _ => panic!("wrong subcommand"),
        }
        assert_eq!(cli.dtype, Dtype::F32);
    }

    #[test]
    fn matmul_alias_and_dtype_flag() {
        let cli =
            Cli::parse_from(["gridcheck", "--dtype", "i32", "matmul", "4", "8", "8", "2"]);
        assert_eq!(cli.dtype, Dtype::I32);
        assert!(matches!(cli.command, Commands::MatrixMul { .. }));
    }

    #[test]
    fn missing_dimensions_are_rejected() {
        assert!(Cli::try_parse_from(["gridcheck", "vector-add"]).is_err());
        assert!(Cli::try_parse_from(["gridcheck", "matrix-mul", "2", "2"]).is_err());
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let mut r1 = StdRng::seed_from_u64(7);
        let mut r2 = StdRng::seed_from_u64(7);
        let a: Vec<f32> = random_operand(&mut r1, 16);
        let b: Vec<f32> = random_operand(&mut r2, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn end_to_end_on_cpu_reports_correct() {
        let cli = Cli::parse_from([
            "gridcheck",
            "--device",
            "cpu",
            "--dtype",
            "f64",
            "matrix-add",
            "9",
            "5",
        ]);
        assert!(run(&cli).unwrap());
    }
}
