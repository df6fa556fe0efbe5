//! Debounced idle countdown.
//!
//! The countdown itself runs on a small timer thread. When it runs out the
//! thread only reports the token it was armed with; whether that expiry still
//! counts is decided by [`IdleTimer::expire`] on the owner's side, so an
//! expiry racing a fresh `arm`/`disarm` is discarded.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug)]
enum TimerCtl {
    Arm { token: u64, after: Duration },
    Disarm,
}

pub struct IdleTimer {
    next_token: u64,
    armed: Option<u64>,
    ctl: Option<Sender<TimerCtl>>,
    join: Option<JoinHandle<()>>,
}

impl IdleTimer {
    /// Start the timer thread. `on_expiry` receives the token of the deadline
    /// that ran out and must hand it back to [`IdleTimer::expire`].
    pub fn spawn<F>(on_expiry: F) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<TimerCtl>();
        let join = thread::Builder::new()
            .name("cadenza-idle".into())
            .spawn(move || {
                let mut pending: Option<(u64, Instant)> = None;
                loop {
                    let msg = match pending {
                        Some((_, deadline)) => {
                            rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                        }
                        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };
                    match msg {
                        Ok(TimerCtl::Arm { token, after }) => {
                            pending = Some((token, Instant::now() + after));
                        }
                        Ok(TimerCtl::Disarm) => pending = None,
                        Err(RecvTimeoutError::Timeout) => {
                            if let Some((token, _)) = pending.take() {
                                on_expiry(token);
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        let join = match join {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn idle timer thread");
                None
            }
        };

        Self {
            next_token: 0,
            armed: None,
            ctl: Some(tx),
            join,
        }
    }

    /// (Re)schedule the single deadline `after` from now, replacing any
    /// pending one. Returns the token the expiry will carry.
    pub fn arm(&mut self, after: Duration) -> u64 {
        self.next_token += 1;
        let token = self.next_token;
        self.armed = Some(token);
        self.send(TimerCtl::Arm { token, after });
        token
    }

    /// Cancel the pending deadline. Safe when already disarmed.
    pub fn disarm(&mut self) {
        if self.armed.take().is_some() {
            self.send(TimerCtl::Disarm);
        }
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Accept an expiry reported by the timer thread. Returns `true` exactly
    /// once for the currently armed token, after which the timer is disarmed.
    pub fn expire(&mut self, token: u64) -> bool {
        if self.armed == Some(token) {
            self.armed = None;
            true
        } else {
            false
        }
    }

    fn send(&self, msg: TimerCtl) {
        let Some(ctl) = self.ctl.as_ref() else {
            return;
        };
        if ctl.send(msg).is_err() {
            tracing::warn!("idle timer thread is gone");
        }
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        // Closing the control channel ends the thread.
        self.ctl = None;
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Receiver;

    fn timer() -> (IdleTimer, Receiver<u64>) {
        let (tx, rx) = mpsc::channel();
        let t = IdleTimer::spawn(move |token| {
            let _ = tx.send(token);
        });
        (t, rx)
    }

    #[test]
    fn fires_once_after_the_delay() {
        let (mut t, rx) = timer();
        let started = Instant::now();
        let token = t.arm(Duration::from_millis(40));

        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, token);
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert!(t.expire(fired));
        assert!(!t.is_armed());

        // Nothing else is scheduled.
        assert!(rx.recv_timeout(Duration::from_millis(120)).is_err());
        assert!(!t.expire(fired));
    }

    #[test]
    fn rearming_keeps_only_the_latest_deadline() {
        let (mut t, rx) = timer();
        let first = t.arm(Duration::from_millis(30));
        let second = t.arm(Duration::from_millis(60));
        assert_ne!(first, second);

        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(fired, second);
        assert!(rx.recv_timeout(Duration::from_millis(120)).is_err());

        assert!(!t.expire(first));
        assert!(t.expire(second));
    }

    #[test]
    fn disarm_cancels_and_is_idempotent() {
        let (mut t, rx) = timer();
        let token = t.arm(Duration::from_millis(30));
        t.disarm();
        t.disarm();
        assert!(!t.is_armed());
        assert!(rx.recv_timeout(Duration::from_millis(120)).is_err());
        assert!(!t.expire(token));
    }

    #[test]
    fn stale_expiry_is_rejected_after_rearm() {
        let (mut t, _rx) = timer();
        let old = t.arm(Duration::from_secs(60));
        let new = t.arm(Duration::from_secs(60));
        // An expiry for `old` that was already in flight must not count.
        assert!(!t.expire(old));
        assert!(t.is_armed());
        assert!(t.expire(new));
    }
}
