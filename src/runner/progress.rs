//! Sampled progress dots on stdout.

use std::io::{self, Write};

/// Prints a `.` for roughly one in every `print_every` finished files
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    print_every: u32,
}

impl Progress {
    pub const DEFAULT_PRINT_EVERY: u32 = 100;

    /// `print_every = 0` disables the dots
    pub fn new(print_every: u32) -> Self {
        Self { print_every }
    }

    pub fn tick(&self) {
        if self.print_every == 0 || rand::random::<f64>() >= 1.0 / self.print_every as f64 {
            return;
        }
        let mut out = io::stdout().lock();
        let _ = write!(out, ".");
        let _ = out.flush();
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PRINT_EVERY)
    }
}
