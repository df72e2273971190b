use std::{convert::TryFrom, time::Duration};

use {
    crate::{
        definitions::{cpu, keyboard, memory, timer},
        devices::{Keypad, SoundCommands},
        display::Display,
        memory::Memory,
        opcode::{Instruction, Opcode, Operation, ProgramCounter, ProgramCounterStep},
        quirks::Quirks,
        timer::{Speaker, TimedWorker, TimerRegister, Worker},
        MemoryError, ProcessError,
    },
    rand::RngCore,
};

/// The Processor struct represents the current state
/// of the system, it contains all the structures
/// needed for emulating an instant on the
/// Chip8 CPU.
pub struct Processor<W = Worker>
where
    W: TimedWorker,
{
    /// all two bytes long and stored big-endian
    pub(super) opcode: Opcode,
    /// The ram and the call stack
    pub(super) memory: Memory,
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles as a flag for some
    /// instructions; thus, it should be avoided. In an addition operation, `VF` is the carry flag,
    /// while in subtraction, it is the "no borrow" flag. In the draw instruction `VF` is set upon
    /// pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index for the register, this is a special register entry
    /// called index `I`
    pub(super) index_register: u16,
    /// The program counter is a CPU register in the computer processor which has the address of the
    /// next instruction to be executed from memory.
    pub(super) program_counter: u16,
    /// Delay timer: This timer is intended to be used for timing the events of games. Its value
    /// can be set and read.
    /// Counts down at 60 hertz, until it reaches 0.
    pub(super) delay_timer: TimerRegister<W>,
    /// Sound timer: This timer is used for sound effects. When its value is nonzero, a beeping
    /// sound is made.
    /// Counts down at 60 hertz, until it reaches 0.
    pub(super) sound_timer: TimerRegister<W>,
    /// Polls the sound timer, only present once the host attached a sound output
    pub(super) speaker: Option<Speaker<W>>,
    pub(super) display: Display,
    pub(super) keypad: Keypad,
    /// The compatibility switches in use
    pub(super) quirks: Quirks,
    /// This stores the random number generator, used by the chipset.
    /// It is stored into the chipset, so as to enable simple mocking
    /// of the given type.
    pub(super) rng: Box<dyn RngCore + Send>,
    /// Optional sleep after every cycle, used when the host calls
    /// [`execute_cycle`](Processor::execute_cycle) in a tight loop.
    pub(super) cycle_delay: Option<Duration>,
}

impl<W: TimedWorker> Default for Processor<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: TimedWorker> Processor<W> {
    /// will create a new processor with the default quirks
    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    /// will create a new processor in its reset state, the timers are
    /// already running.
    pub fn with_quirks(quirks: Quirks) -> Self {
        let interval = Duration::from_micros(timer::INTERVAL);
        let mut chip = Self {
            opcode: 0,
            memory: Memory::new(),
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: cpu::PROGRAM_COUNTER,
            delay_timer: TimerRegister::new(interval),
            sound_timer: TimerRegister::new(interval),
            speaker: None,
            display: Display::new(),
            keypad: Keypad::new(),
            quirks,
            rng: Box::new(rand::rngs::OsRng),
            cycle_delay: None,
        };
        chip.reset();
        chip
    }

    /// Replaces the random number source used by `CXNN`.
    pub fn with_rng<R>(mut self, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        self.rng = Box::new(rng);
        self
    }

    /// Lets every cycle sleep for `delay` after execution.
    pub fn with_cycle_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay = Some(delay);
        self
    }

    /// Starts the task that beeps while the sound timer is set.
    pub fn attach_sound<S>(&mut self, sound: S)
    where
        S: SoundCommands + Send + 'static,
    {
        let interval = Duration::from_micros(timer::INTERVAL);
        self.speaker = Some(Speaker::start(self.sound_timer.handle(), sound, interval));
    }

    /// Brings the hardware back into the power on state, the rom has to be
    /// loaded again afterwards.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.memory.load_fontset();
        self.display.clear();

        self.opcode = 0;
        self.program_counter = cpu::PROGRAM_COUNTER;
        self.index_register = 0;
        self.registers = [0; cpu::register::SIZE];

        self.delay_timer.set_value(0);
        self.sound_timer.set_value(0);
        self.delay_timer.start();
        self.sound_timer.start();
    }

    /// Will write the rom into memory at the program start.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), MemoryError> {
        self.memory.load_rom(rom, memory::PROGRAM_START)
    }

    /// will advance the program by a single instruction
    ///
    /// On failure the program counter is left at the failing instruction.
    pub fn execute_cycle(&mut self) -> Result<Operation, ProcessError> {
        let pc = self.program_counter;
        let res = self.cycle();
        if res.is_err() {
            self.program_counter = pc;
        }
        if let Some(delay) = self.cycle_delay {
            std::thread::sleep(delay);
        }
        res
    }

    fn cycle(&mut self) -> Result<Operation, ProcessError> {
        let pc = self.program_counter;
        let high = self.fetch()?;
        let low = self.fetch()?;
        self.opcode = Opcode::from_be_bytes([high, low]);

        let instruction = Instruction::try_from(self.opcode)?;
        log::trace!("{:#06X}: {:#06X} {}", pc, self.opcode, instruction);

        self.calc(instruction)
    }

    /// Reads the byte under the program counter and moves past it.
    fn fetch(&mut self) -> Result<u8, MemoryError> {
        let byte = self.memory.read(self.program_counter as usize)?;
        self.program_counter = self.program_counter.wrapping_add(1);
        Ok(byte)
    }

    /// Will set the value of the given key
    pub fn enable_key(&mut self, code: u8) {
        self.keypad.enable_key(code)
    }

    pub fn disable_key(&mut self, code: u8) {
        self.keypad.disable_key(code)
    }

    /// Will write keyboard data into interncal keyboard representation.
    pub fn set_keys(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keypad.set_keys(keys)
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// will return the sound timer
    pub fn sound_timer(&self) -> u8 {
        self.sound_timer.value()
    }

    /// will return the delay timer
    pub fn delay_timer(&self) -> u8 {
        self.delay_timer.value()
    }

    /// The frame buffer a renderer samples
    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn registers(&self) -> &[u8] {
        &self.registers[..]
    }

    pub fn index_register(&self) -> u16 {
        self.index_register
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    /// The last opcode fetched
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }
}

impl<W: TimedWorker> ProgramCounter for Processor<W> {
    fn step(&mut self, step: ProgramCounterStep) {
        self.program_counter = step.apply(self.program_counter);
    }
}
