use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chip8_vm::{Cycle, Machine, RandomSource, memory::HALT_SENTINEL};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::{
    keyboard::{KeyboardState, map_key_to_index},
    sound::Speaker,
    virtual_buffer::VirtualDisplay,
};

/// The machine as wired up by the desktop host
pub type HostMachine = Machine<VirtualDisplay, Option<Speaker>, Box<dyn RandomSource>>;

/// The word the loader appends after every program
const HALT_WORD: u16 = u16::from_be_bytes(HALT_SENTINEL);

/// The Application GUI
pub struct App {
    /// The Application's window
    window: Option<Arc<Window>>,
    /// The application's rendering plane
    pixels: Option<Pixels<'static>>,
    /// The virtual machine
    machine: HostMachine,
    /// The ROM, kept around so a reset can reload it
    rom: Vec<u8>,
    /// Physical key state, fed to the machine once per frame
    keyboard: KeyboardState,
    /// Only advance one cycle per space bar press
    step_through: bool,
    /// Set once the program ran off its end or hit a fatal error
    halted: bool,
    /// The last time the CPU was ticked. Used for frequency emulation.
    last_cpu_time: Instant,
}

impl App {
    /// Construct a new application around a machine with `rom` already loaded
    pub fn new(machine: HostMachine, rom: Vec<u8>, step_through: bool) -> Self {
        Self {
            window: None,
            pixels: None,
            machine,
            rom,
            keyboard: KeyboardState::default(),
            step_through,
            halted: false,
            last_cpu_time: Instant::now(),
        }
    }

    /// Renders the virtual display to the [`Self::pixels`] plane
    fn draw(&mut self) {
        if let Some(pixels) = &mut self.pixels {
            let frame = pixels.frame_mut();
            self.machine.renderer_mut().render_to_buffer(frame);

            if let Err(e) = pixels.render() {
                log::error!("Rendering failed: {:?}", e);
            }
        }
    }

    /// Runs a single machine cycle and reacts to how it went
    fn run_cycle(&mut self) {
        let address = self.machine.program_counter();

        match self.machine.step() {
            Ok(Cycle::DecodeFault(HALT_WORD)) => {
                log::info!("Program ended at 0x{:03x}", address);
                self.halted = true;
            }
            Ok(Cycle::Executed(instruction)) if self.step_through => {
                log::info!("0x{:03x}: {}", address, instruction);
            }
            Ok(Cycle::AwaitingKey) if self.step_through => {
                log::info!("Waiting for a key");
            }
            Ok(_) => (),
            Err(e) => {
                log::error!("Machine stopped: {}", e);
                log::debug!("{:?}", self.machine);
                self.halted = true;
            }
        }
    }

    /// Puts the machine back into its power-on state and reloads the ROM
    fn restart(&mut self) {
        log::info!("Restarting");
        self.machine.reset();
        self.keyboard.release_all();
        if let Err(e) = self.machine.load_program(&self.rom) {
            log::error!("Could not reload program: {}", e);
            self.halted = true;
            return;
        }
        self.halted = false;
        self.last_cpu_time = Instant::now();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let display = self.machine.renderer();
        let width = display.scaled_width() as u32;
        let height = display.scaled_height() as u32;

        // The window is an Arc in order to have an owned shared reference with the pixels plane
        log::info!("Creating window ({}x{})", width, height);
        let window = Arc::new(
            match event_loop.create_window(
                Window::default_attributes()
                    .with_title("CHIP-8")
                    .with_inner_size(LogicalSize::new(width, height)),
            ) {
                Ok(w) => w,
                Err(e) => {
                    log::error!("Error constructing window: {:?}", e);
                    std::process::exit(1);
                }
            },
        );

        let size = window.inner_size();
        let surface_texture = SurfaceTexture::new(size.width, size.height, Arc::clone(&window));
        let pixels = match Pixels::new(width, height, surface_texture) {
            Ok(p) => p,
            Err(e) => {
                log::error!("Error constructing pixel buffer: {:?}", e);
                std::process::exit(1);
            }
        };

        self.pixels = Some(pixels);
        self.window = Some(window);

        self.last_cpu_time = Instant::now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::debug!("Close requested, stopping...");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    // filter for non-repeated keypresses
                    KeyEvent {
                        state,
                        logical_key,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                log::trace!("Keyboard Input: {:?}, {:?}", logical_key, state);
                match logical_key {
                    Key::Named(NamedKey::Escape) => event_loop.exit(),
                    Key::Named(NamedKey::Backspace) if state.is_pressed() => self.restart(),
                    Key::Named(NamedKey::F1) if state.is_pressed() => self.machine.dump_state(),
                    Key::Named(NamedKey::Space)
                        if state.is_pressed() && self.step_through && !self.halted =>
                    {
                        self.machine.poll_input(&self.keyboard);
                        self.run_cycle();
                    }
                    Key::Character(text) => {
                        if let Some(key_index) = map_key_to_index(text.as_str()) {
                            match state {
                                ElementState::Pressed => self.keyboard.press_key(key_index),
                                ElementState::Released => self.keyboard.release_key(key_index),
                            }
                        }
                    }
                    _ => (),
                }
            }
            WindowEvent::RedrawRequested => {
                self.draw();
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if !self.step_through && !self.halted {
            self.machine.poll_input(&self.keyboard);

            // CPU clock timer; the machine derives its 60Hz timers from the same rate
            let rate = self.machine.config().instruction_rate.max(1);
            let cpu_time = Duration::from_secs_f64(1.0 / rate as f64);
            while self.last_cpu_time.elapsed() >= cpu_time && !self.halted {
                self.run_cycle();
                self.last_cpu_time += cpu_time;
            }
        }

        // only repaint when the machine drew something
        if let Some(window) = &self.window
            && self.machine.renderer().is_dirty()
        {
            window.request_redraw();
        }
    }
}
