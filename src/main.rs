use chip8_vm::{
    LogDiagnostics, Machine, MachineConfig, RandomSource, SeededRandom, ThreadRandom,
    config::DEFAULT_INSTRUCTION_RATE,
};
use clap::Parser;
use winit::event_loop::{ControlFlow, EventLoop};

use crate::{app::App, sound::Speaker, virtual_buffer::VirtualDisplay};

mod app;
mod keyboard;
mod sound;
mod virtual_buffer;

/// Defines this program's command-line arguments
#[derive(Parser, Debug)]
#[command(about = "Runs a CHIP-8 program")]
struct Args {
    /// Path to a raw CHIP-8 ROM
    #[arg(index = 1)]
    input_file: String,

    /// Instructions executed per second
    #[arg(long, default_value_t = DEFAULT_INSTRUCTION_RATE)]
    rate: u32,

    /// Real pixels per CHIP-8 pixel
    #[arg(long, default_value_t = 20)]
    scale: usize,

    /// Seed for CXNN, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Execute one instruction per press of the space bar
    #[arg(long)]
    step: bool,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    log::info!("Loading program from: {}", args.input_file);
    let data = match std::fs::read(&args.input_file) {
        Ok(v) => v,
        Err(e) => {
            log::error!("Expected a path to a CHIP-8 program");
            log::error!("{:?}", e);
            std::process::exit(1);
        }
    };

    let random: Box<dyn RandomSource> = match args.seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    };
    let speaker = Speaker::new();
    log::debug!("Audio output: {:?}", speaker);

    let mut machine = Machine::new(
        VirtualDisplay::new(args.scale),
        speaker,
        random,
        MachineConfig {
            instruction_rate: args.rate,
        },
    )
    .with_diagnostics(Box::new(LogDiagnostics));

    if let Err(e) = machine.load_program(&data) {
        log::error!("{}", e);
        std::process::exit(1);
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Could not create event loop: {:?}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(machine, data, args.step);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop failed: {:?}", e);
        std::process::exit(1);
    }
}
