use std::{sync::Arc, time::Duration};

use parking_lot::{Mutex, MutexGuard};

use crate::{
    definitions::cpu,
    devices::{DisplayCommands, KeyboardCommands},
    opcode::Operation,
    processor::Processor,
    timer::{TimedWorker, Worker},
    ProcessError,
};

/// The controls shared between the host and the worker.
#[derive(Debug, Default)]
struct RunState {
    paused: bool,
    /// single cycles requested while paused
    steps: usize,
    /// the error that halted the run
    error: Option<ProcessError>,
}

impl RunState {
    /// Checks if the next tick may run a cycle, consuming a step if paused.
    fn take_cycle(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }
        if !self.paused {
            return true;
        }
        if self.steps > 0 {
            self.steps -= 1;
            return true;
        }
        false
    }
}

/// Drives a [`Processor`] on a background worker at the cpu rate, without
/// any window attached.
pub struct Runner<W = Worker>
where
    W: TimedWorker,
{
    worker: W,
    processor: Arc<Mutex<Processor<W>>>,
    state: Arc<Mutex<RunState>>,
}

impl<W> Runner<W>
where
    W: TimedWorker + Send + 'static,
{
    /// Will start running the processor right away. Every tick that may run a
    /// cycle copies the keyboard state into the keypad, executes the cycle and
    /// calls the display whenever the screen changed. Once halted by an error
    /// the ticks do nothing.
    pub fn start<D, K>(processor: Processor<W>, mut display: D, mut keyboard: K) -> Self
    where
        D: DisplayCommands + Send + 'static,
        K: KeyboardCommands + Send + 'static,
    {
        let processor = Arc::new(Mutex::new(processor));
        let state = Arc::new(Mutex::new(RunState::default()));

        let inner_processor = processor.clone();
        let inner_state = state.clone();
        let inner_run = move || {
            // never wait for the processor while holding the state, the host
            // may hold the processor and call the controls
            if !inner_state.lock().take_cycle() {
                return;
            }

            let mut chip = inner_processor.lock();
            chip.set_keys(&keyboard.keys());

            let err = match chip.execute_cycle() {
                Ok(Operation::Draw) => {
                    display.display(chip.display().buffer());
                    return;
                }
                Ok(Operation::None) | Ok(Operation::Wait) => return,
                Err(err) => err,
            };
            log::error!(
                "halting at {:#06X} ({:#06X}): {}",
                chip.program_counter(),
                chip.opcode(),
                err
            );
            drop(chip);

            inner_state.lock().error = Some(err);
        };

        let mut worker = W::new();
        worker.start(inner_run, Duration::from_millis(cpu::INTERVAL));
        log::debug!("runner started");

        Self {
            worker,
            processor,
            state,
        }
    }

    /// Stops executing cycles until [`resume`](Runner::resume) is called.
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    pub fn resume(&self) {
        let mut state = self.state.lock();
        state.paused = false;
        state.steps = 0;
    }

    /// Will run a single cycle on the next tick, only has an effect while paused.
    pub fn step(&self) {
        let mut state = self.state.lock();
        if state.paused {
            state.steps += 1;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// The error that halted the processor, if any.
    pub fn error(&self) -> Option<ProcessError> {
        self.state.lock().error.clone()
    }

    /// Gives access to the processor, the run is blocked while the guard lives.
    pub fn processor(&self) -> MutexGuard<'_, Processor<W>> {
        self.processor.lock()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_alive()
    }

    pub fn stop(&mut self) {
        self.worker.stop();
        log::debug!("runner stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        definitions::keyboard,
        devices::{MockDisplayCommands, MockKeyboardCommands},
        OpcodeError,
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc,
    };

    /// How long the tests let the runner work
    const SETTLE: Duration = Duration::from_millis(100);

    fn no_keys() -> MockKeyboardCommands {
        let mut input = MockKeyboardCommands::new();
        input.expect_keys().returning(|| [false; keyboard::SIZE]);
        input
    }

    /// A display that only counts how often it was called, expectations
    /// can not fail a test from within the worker thread.
    fn counting_display(draws: Arc<AtomicUsize>) -> MockDisplayCommands {
        let mut display = MockDisplayCommands::new();
        display.expect_display().returning(move |_| {
            draws.fetch_add(1, Ordering::SeqCst);
        });
        display
    }

    fn setup_runner(rom: &[u8], input: MockKeyboardCommands) -> (Runner, Arc<AtomicUsize>) {
        let mut processor: Processor = Processor::new();
        processor.load_rom(rom).unwrap();

        let draws = Arc::new(AtomicUsize::new(0));
        let runner = Runner::start(processor, counting_display(draws.clone()), input);
        (runner, draws)
    }

    #[test]
    fn test_runner_draws() {
        let (mut runner, draws) = setup_runner(&[0x00, 0xE0, 0x12, 0x00], no_keys());
        assert!(runner.is_running());

        std::thread::sleep(SETTLE);

        assert!(draws.load(Ordering::SeqCst) > 0);
        assert_eq!(runner.error(), None);

        runner.stop();
        assert!(!runner.is_running());
    }

    #[test]
    fn test_runner_halts_on_error() {
        let (mut runner, draws) = setup_runner(&[0x51, 0x21], no_keys());

        std::thread::sleep(SETTLE);

        assert_eq!(
            runner.error(),
            Some(ProcessError::Opcode(OpcodeError::InvalidOpcode(0x5121)))
        );
        assert_eq!(runner.processor().program_counter(), cpu::PROGRAM_COUNTER);
        assert_eq!(draws.load(Ordering::SeqCst), 0);
        runner.stop();
    }

    #[test]
    fn test_runner_pause_and_step() {
        // a long run of `7001` so every step adds exactly one
        let mut rom: Vec<u8> = [0x70, 0x01].repeat(200);
        rom.extend_from_slice(&[0x12, 0x00]);
        let (mut runner, _) = setup_runner(&rom, no_keys());

        runner.pause();
        assert!(runner.is_paused());
        // a tick that started before the pause may still finish its cycle
        std::thread::sleep(Duration::from_millis(10));
        let value = runner.processor().registers()[0];

        std::thread::sleep(SETTLE);
        assert_eq!(runner.processor().registers()[0], value);

        runner.step();
        runner.step();
        std::thread::sleep(SETTLE);
        assert_eq!(runner.processor().registers()[0], value.wrapping_add(2));

        runner.resume();
        assert!(!runner.is_paused());
        std::thread::sleep(SETTLE);
        assert!(runner.processor().program_counter() > cpu::PROGRAM_COUNTER);
        runner.stop();
    }

    #[test]
    fn test_controls_while_holding_processor() {
        let (runner, _) = setup_runner(&[0x00, 0xE0, 0x12, 0x00], no_keys());

        let (send, recv) = mpsc::channel();
        std::thread::spawn(move || {
            for _ in 0..200 {
                let processor = runner.processor();
                std::thread::sleep(Duration::from_millis(3));
                runner.pause();
                runner.step();
                runner.resume();
                assert_eq!(runner.error(), None);
                drop(processor);
            }
            let _ = send.send(runner);
        });

        let mut runner = recv
            .recv_timeout(Duration::from_secs(10))
            .expect("the controls blocked against the running worker");
        runner.stop();
    }

    #[test]
    fn test_halted_runner_stops_polling() {
        let polls = Arc::new(AtomicUsize::new(0));
        let mut input = MockKeyboardCommands::new();
        let counter = polls.clone();
        input.expect_keys().returning(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            [false; keyboard::SIZE]
        });
        let (mut runner, _) = setup_runner(&[0x51, 0x21], input);

        std::thread::sleep(SETTLE);
        assert!(runner.error().is_some());
        let halted = polls.load(Ordering::SeqCst);
        assert_eq!(halted, 1);

        std::thread::sleep(SETTLE);
        assert_eq!(polls.load(Ordering::SeqCst), halted);
        runner.stop();
    }

    #[test]
    fn test_take_cycle() {
        let mut state = RunState::default();
        assert!(state.take_cycle());

        state.paused = true;
        assert!(!state.take_cycle());

        state.steps = 1;
        assert!(state.take_cycle());
        assert!(!state.take_cycle());

        state.paused = false;
        state.error = Some(ProcessError::Stack(crate::StackError::Empty));
        assert!(!state.take_cycle());
    }

    #[test]
    fn test_runner_pumps_keyboard() {
        let mut input = MockKeyboardCommands::new();
        input.expect_keys().returning(|| {
            let mut keys = [false; keyboard::SIZE];
            keys[0x7] = true;
            keys
        });
        // wait for a key into V1, then loop at 0x202
        let (mut runner, _) = setup_runner(&[0xF1, 0x0A, 0x12, 0x02], input);

        std::thread::sleep(SETTLE);

        let processor = runner.processor();
        assert_eq!(processor.registers()[1], 0x7);
        assert_eq!(processor.program_counter(), 0x202);
        assert!(processor.keypad().is_key_pressed(0x7));
        drop(processor);
        runner.stop();
    }
}
