use {
    crate::{definitions::timer, devices::SoundCommands},
    std::{
        sync::{
            atomic::{AtomicU8, Ordering},
            mpsc::{self, RecvTimeoutError, SyncSender},
            Arc,
        },
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
};

/// Something that is able to run a callback periodically in the background.
pub trait TimedWorker {
    fn new() -> Self;
    /// Will run the callback every `interval` until stopped.
    fn start<T>(&mut self, callback: T, interval: Duration)
    where
        T: Send + FnMut() + 'static;
    fn stop(&mut self);
    fn is_alive(&self) -> bool;
}

/// Shared view of a timer value.
///
/// The processor and the background task both hold one, the value itself
/// is a single atomic byte.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    value: Arc<AtomicU8>,
}

impl TimerHandle {
    pub fn new(value: u8) -> Self {
        Self {
            value: Arc::new(AtomicU8::new(value)),
        }
    }

    pub fn get(&self) -> u8 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: u8) {
        self.value.store(value, Ordering::Release);
    }

    /// Will reset the value to zero and return what was there before.
    pub fn take(&self) -> u8 {
        self.value.swap(0, Ordering::AcqRel)
    }

    /// Counts down by one, stays at zero once reached.
    ///
    /// Uses a compare and swap loop so a value written by the processor
    /// between the load and the store is never overwritten.
    pub fn decrement(&self) -> u8 {
        match self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |val| val.checked_sub(1))
        {
            Ok(prev) => prev - 1,
            Err(zero) => zero,
        }
    }
}

/// Represents a timer inside of the chip
/// infrastruture, once started it will count
/// down to zero from what ever number given
/// at 60Hz.
pub struct TimerRegister<W: TimedWorker> {
    worker: W,
    handle: TimerHandle,
    interval: Duration,
}

impl<W: TimedWorker> Default for TimerRegister<W> {
    fn default() -> Self {
        Self::new(Duration::from_micros(timer::INTERVAL))
    }
}

impl<W: TimedWorker> TimerRegister<W> {
    /// Creates a stopped timer at zero.
    pub fn new(interval: Duration) -> Self {
        Self {
            worker: W::new(),
            handle: TimerHandle::default(),
            interval,
        }
    }

    /// Will start the background decrement, does nothing if it already runs.
    pub fn start(&mut self) {
        if self.worker.is_alive() {
            return;
        }
        let handle = self.handle.clone();
        self.worker.start(
            move || {
                handle.decrement();
            },
            self.interval,
        );
    }

    pub fn stop(&mut self) {
        self.worker.stop();
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_alive()
    }

    /// Will get the value that the counter is currently at.
    pub fn value(&self) -> u8 {
        self.handle.get()
    }

    /// Will set the value from which the timer shall count down from.
    pub fn set_value(&self, value: u8) {
        self.handle.set(value);
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }
}

/// Polls the sound timer and beeps whenever it finds it set.
pub struct Speaker<W: TimedWorker> {
    worker: W,
}

impl<W: TimedWorker> Speaker<W> {
    pub fn start<S>(timer: TimerHandle, mut sound: S, interval: Duration) -> Self
    where
        S: SoundCommands + Send + 'static,
    {
        let mut worker = W::new();
        worker.start(move || beep_if_sounding(&timer, &mut sound), interval);
        Self { worker }
    }

    pub fn stop(&mut self) {
        self.worker.stop();
    }

    pub fn is_alive(&self) -> bool {
        self.worker.is_alive()
    }
}

/// A nonzero sound timer results in exactly one beep, the timer is cleared
/// with the same atomic operation.
fn beep_if_sounding<S: SoundCommands>(timer: &TimerHandle, sound: &mut S) {
    if timer.take() != 0 {
        sound.beep();
    }
}

/// Is the internal worker, that exists on the
/// second thread.
pub struct Worker {
    /// Contains the actuall thread, that is running.
    thread: Option<JoinHandle<()>>,
    /// Contains the sync sender used to gracefull shutdown the thread.
    shutdown: Option<SyncSender<()>>,
    /// Counts the actuall threads used. It uses an ```()``` so that it doesn't use
    /// up too much memory.
    alive: Arc<()>,
}

impl TimedWorker for Worker {
    /// Will initialize the new worker.
    fn new() -> Self {
        Self {
            thread: None,
            shutdown: None,
            alive: Arc::new(()),
        }
    }

    /// Will start the worker that will run the callback function
    /// every interval.
    /// Attention the timer assumes the callback will finish
    /// calculation faster then the interval.
    fn start<T>(&mut self, mut callback: T, interval: Duration)
    where
        T: Send + FnMut() + 'static,
    {
        // a worker only ever drives a single callback
        self.stop();

        let (send, recv) = mpsc::sync_channel::<()>(1);
        let alive = self.alive.clone();
        let thread = thread::spawn(move || {
            // this is to count the references, as it will not actually
            // be used ```_``` is used in front of the name.
            let _alive = alive;
            let mut timeout = interval;
            loop {
                match recv.recv_timeout(timeout) {
                    Err(RecvTimeoutError::Timeout) => {
                        let start = Instant::now();

                        callback();

                        // make sure there the system will at most wait the interval
                        timeout = interval.saturating_sub(start.elapsed());
                    }
                    Ok(_) | Err(_) => break, // shutdown
                }
            }
        });

        self.thread = Some(thread);
        self.shutdown = Some(send);
    }

    /// Will stop the worker.
    fn stop(&mut self) {
        // Will stop the worker, in two steps one by sending an empty message
        // and second by droping the only sender for the given receiver.
        if let Some(sender) = self.shutdown.take() {
            // the thread might have already died, the join below reports that
            let _ = sender.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("The worker thread paniced before shutdown.");
            }
        }
    }

    /// Checks if the thread is alive.
    fn is_alive(&self) -> bool {
        Arc::strong_count(&self.alive) > 1
    }
}

impl Drop for Worker {
    /// Will drop the worker
    fn drop(&mut self) {
        self.stop();
    }
}

/// A worker that never runs its callback, used to keep timers still
/// during opcode tests.
#[cfg(test)]
pub(crate) struct IdleWorker;

#[cfg(test)]
impl TimedWorker for IdleWorker {
    fn new() -> Self {
        IdleWorker
    }

    fn start<T>(&mut self, _callback: T, _interval: Duration)
    where
        T: Send + FnMut() + 'static,
    {
    }

    fn stop(&mut self) {}

    fn is_alive(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::MockSoundCommands;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_timer() {
        let mut timer: TimerRegister<Worker> = TimerRegister::default();
        timer.set_value(timer::HERTZ);
        assert!(!timer.is_running());

        timer.start();
        assert!(timer.is_running());

        std::thread::sleep(Duration::from_millis(1500));
        assert_eq!(timer.value(), 0);

        timer.stop();
        assert!(!timer.is_running());
    }

    #[test]
    fn test_timer_counts_down_gradually() {
        let mut timer: TimerRegister<Worker> = TimerRegister::default();
        timer.set_value(u8::MAX);
        timer.start();

        std::thread::sleep(Duration::from_millis(200));
        let value = timer.value();
        assert!(value < u8::MAX);
        assert!(value > 0);
    }

    #[test]
    fn test_decrement_stops_at_zero() {
        let handle = TimerHandle::new(2);
        assert_eq!(handle.decrement(), 1);
        assert_eq!(handle.decrement(), 0);
        assert_eq!(handle.decrement(), 0);
        assert_eq!(handle.get(), 0);
    }

    #[test]
    fn test_default_interval_is_sixty_hertz() {
        let timer: TimerRegister<Worker> = TimerRegister::default();
        assert_eq!(timer.interval, Duration::from_micros(16_666));

        // sixty ticks stay within a millisecond of one second
        let second = timer.interval * timer::HERTZ as u32;
        assert!(second <= Duration::from_secs(1));
        assert!(second > Duration::from_millis(999));
    }

    #[test]
    fn test_beep_if_sounding() {
        let timer = TimerHandle::new(0);
        let mut sound = MockSoundCommands::new();
        sound.expect_beep().times(1).return_const(());

        // silent timer does not beep
        beep_if_sounding(&timer, &mut sound);

        timer.set(10);
        beep_if_sounding(&timer, &mut sound);
        assert_eq!(timer.get(), 0);

        beep_if_sounding(&timer, &mut sound);
    }

    struct CountingSound(Arc<AtomicUsize>);

    impl SoundCommands for CountingSound {
        fn beep(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_speaker() {
        let beeps = Arc::new(AtomicUsize::new(0));
        let timer = TimerHandle::new(0);
        let mut speaker: Speaker<Worker> = Speaker::start(
            timer.clone(),
            CountingSound(beeps.clone()),
            Duration::from_micros(timer::INTERVAL),
        );
        assert!(speaker.is_alive());

        timer.set(30);
        std::thread::sleep(Duration::from_millis(200));

        assert_eq!(beeps.load(Ordering::SeqCst), 1);
        assert_eq!(timer.get(), 0);

        speaker.stop();
        assert!(!speaker.is_alive());
    }
}
