use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// One turn of the quiz loop: the wall time since the previous turn, and
/// the key that ended the wait, if any. Time is applied before the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub elapsed: Duration,
    pub key: Option<KeyEvent>,
}

/// Where key presses come from.
pub trait KeySource {
    /// Waits up to `timeout` for the next key press.
    fn next_key(&self, timeout: Duration) -> Result<KeyEvent, RecvTimeoutError>;
}

/// Reads key presses from the terminal on a background thread. Resize and
/// mouse events are dropped; the loop redraws every step anyway.
pub struct TerminalKeys {
    rx: Receiver<KeyEvent>,
}

impl TerminalKeys {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || loop {
            match event::read() {
                // Some terminals also report releases and repeats.
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("terminal input closed: {e}");
                    break;
                }
            }
        });
        Self { rx }
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&self, timeout: Duration) -> Result<KeyEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Keys fed through a channel, for driving the loop without a terminal.
pub struct ChannelKeys {
    rx: Receiver<KeyEvent>,
}

impl ChannelKeys {
    pub fn new(rx: Receiver<KeyEvent>) -> Self {
        Self { rx }
    }
}

impl KeySource for ChannelKeys {
    fn next_key(&self, timeout: Duration) -> Result<KeyEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Paces the quiz loop and measures the time between steps, so the countdown
/// follows the wall clock however long a step took.
pub struct Runner<K: KeySource> {
    keys: K,
    poll: Duration,
    last: Instant,
}

impl<K: KeySource> Runner<K> {
    pub fn new(keys: K, poll: Duration) -> Self {
        Self {
            keys,
            poll,
            last: Instant::now(),
        }
    }

    /// Blocks up to the poll interval for a key and reports how much time
    /// has passed since the previous step.
    pub fn step(&mut self) -> Step {
        let key = match self.keys.next_key(self.poll) {
            Ok(key) => Some(key),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                // No more input; keep the clock moving without spinning.
                std::thread::sleep(self.poll);
                None
            }
        };
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        Step { elapsed, key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn idle_step_waits_for_the_poll_interval() {
        let (_tx, rx) = mpsc::channel();
        let mut runner = Runner::new(ChannelKeys::new(rx), Duration::from_millis(20));

        let step = runner.step();
        assert_eq!(step.key, None);
        assert!(step.elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn queued_key_returns_without_waiting() {
        let (tx, rx) = mpsc::channel();
        let key = KeyEvent::new(KeyCode::Char('1'), KeyModifiers::NONE);
        tx.send(key).unwrap();
        let mut runner = Runner::new(ChannelKeys::new(rx), Duration::from_secs(5));

        let step = runner.step();
        assert_eq!(step.key, Some(key));
        assert!(step.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn elapsed_counts_time_spent_between_steps() {
        let (_tx, rx) = mpsc::channel();
        let mut runner = Runner::new(ChannelKeys::new(rx), Duration::from_millis(1));
        runner.step();

        std::thread::sleep(Duration::from_millis(30));
        let step = runner.step();
        assert!(step.elapsed >= Duration::from_millis(30));
    }

    #[test]
    fn disconnected_source_still_paces_time() {
        let (tx, rx) = mpsc::channel::<KeyEvent>();
        drop(tx);
        let mut runner = Runner::new(ChannelKeys::new(rx), Duration::from_millis(5));

        let step = runner.step();
        assert_eq!(step.key, None);
        assert!(step.elapsed >= Duration::from_millis(5));
    }
}
