use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use shil::instructions::{class_of, name_of};
use shil::isa::sh4::{self, lift::Lifter, CpuMode, Sh4Lifter};
use shil::{LinearMemory, RegProfile, RegisterBinding, Session, ShOp, Trap};

#[derive(Parser, Debug)]
#[command(author, version, about = "Lift SuperH-4 instructions to IL and run them")]
struct Opts {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the IL of every record in a JSON file.
    Lift {
        #[arg(value_name = "JSONFILE")]
        input: String,
        /// Lift as if SR.MD were set.
        #[arg(long)]
        privileged: bool,
    },
    /// Execute the records on a fresh SH-4 session and dump the registers.
    Run {
        #[arg(value_name = "JSONFILE")]
        input: String,
        #[arg(long)]
        privileged: bool,
        #[arg(long)]
        big_endian: bool,
        /// Raw image loaded at address 0.
        #[arg(long)]
        image: Option<String>,
        #[arg(long, default_value_t = 64 * 1024)]
        mem_size: usize,
    },
    /// Print the register binding derived from a profile.
    Binding {
        /// JSON register profile; the built-in SH-4 profile otherwise.
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

/// One decoded instruction and its address.
#[derive(Deserialize, Debug)]
struct Record {
    pc: u64,
    op: ShOp,
}

fn read_records(path: &str) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {path}"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    match opts.cmd {
        Cmd::Lift { input, privileged } => lift(&input, privileged),
        Cmd::Run {
            input,
            privileged,
            big_endian,
            image,
            mem_size,
        } => run(&input, privileged, big_endian, image.as_deref(), mem_size),
        Cmd::Binding { profile, json } => binding(profile.as_deref(), json),
    }
}

fn lift(input: &str, privileged: bool) -> Result<()> {
    let mode = if privileged {
        CpuMode::Privileged
    } else {
        CpuMode::User
    };
    for Record { pc, op } in read_records(input)? {
        let name = name_of(op.mnemonic);
        let class = class_of(op.mnemonic);
        match Sh4Lifter.lift(&op, pc, &mode) {
            Ok(lifted) => println!("{pc:#010x}  {name:<8} {class:<10} {lifted}"),
            Err(e) => println!("{pc:#010x}  {name:<8} {class:<10} <{e}>"),
        }
    }
    Ok(())
}

fn run(
    input: &str,
    privileged: bool,
    big_endian: bool,
    image: Option<&str>,
    mem_size: usize,
) -> Result<()> {
    let mut mem = LinearMemory::new(mem_size).big_endian(big_endian);
    if let Some(path) = image {
        let bytes = std::fs::read(path).with_context(|| format!("reading {path}"))?;
        mem.load(0, &bytes)?;
    }
    let mut session = Session::sh4(big_endian)?;
    if privileged {
        session.regs_mut().set("sr_d", 1);
    }
    for Record { pc, op } in read_records(input)? {
        session.reset(pc as u32);
        match session.execute(&op, &mut mem) {
            Ok(()) => {}
            Err(Trap::Exception { pc, name }) => println!("{pc:#010x}  exception {name}"),
            Err(trap) => {
                eprintln!("TRAP: {trap}");
                break;
            }
        }
    }
    let regs = session.regs();
    for item in &regs.profile().items {
        if let Some(value) = regs.get(&item.name) {
            println!("{:<6} {value:#010x}", item.name);
        }
    }
    Ok(())
}

fn binding(profile: Option<&str>, json: bool) -> Result<()> {
    let profile = match profile {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            RegProfile::from_json(&text)?
        }
        None => sh4::profile(),
    };
    let rb = RegisterBinding::derive(&profile);
    if json {
        println!("{}", serde_json::to_string_pretty(&rb)?);
    } else {
        for item in rb.items() {
            println!("{:<6} {}", item.name, item.size);
        }
    }
    Ok(())
}
