use anyhow::Result;
use loopavatar::driver::Presenter;
use loopavatar::log_debug;
use loopavatar::video::Frame;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[cfg(feature = "window")]
use anyhow::anyhow;
#[cfg(feature = "window")]
use minifb::{Key, Window, WindowOptions};

/// Desktop window; Escape or closing the window ends the loop.
#[cfg(feature = "window")]
pub(crate) struct WindowPresenter {
    window: Window,
    width: usize,
    height: usize,
}

#[cfg(feature = "window")]
impl WindowPresenter {
    pub(crate) fn open(width: usize, height: usize) -> Result<Self> {
        let window = Window::new("LoopAvatar", width, height, WindowOptions::default())
            .map_err(|err| anyhow!("failed to open window: {err}"))?;
        Ok(Self {
            window,
            width,
            height,
        })
    }
}

#[cfg(feature = "window")]
impl Presenter for WindowPresenter {
    fn present(&mut self, frame: &Frame) -> Result<()> {
        let frame = if frame.dimensions() == (self.width, self.height) {
            frame.to_0rgb()
        } else {
            frame.resized(self.width, self.height).to_0rgb()
        };
        self.window
            .update_with_buffer(&frame, self.width, self.height)
            .map_err(|err| anyhow!("window update failed: {err}"))
    }

    fn idle(&mut self) -> Result<()> {
        // minifb only pumps window events inside update calls
        self.window.update();
        Ok(())
    }

    fn exit_requested(&self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Escape)
    }
}

/// Decodes and filters without displaying anything.
#[derive(Debug, Default)]
pub(crate) struct HeadlessPresenter {
    frames: u64,
}

impl Presenter for HeadlessPresenter {
    fn present(&mut self, _frame: &Frame) -> Result<()> {
        self.frames += 1;
        if self.frames % 1000 == 0 {
            log_debug(&format!("headless: {} frames", self.frames));
        }
        Ok(())
    }
}

pub(crate) fn is_quit_command(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "q" | "quit" | "exit")
}

/// Set `cancel` when `q`, `quit` or `exit` is typed on stdin.
pub(crate) fn spawn_quit_watcher(cancel: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name("loopavatar-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if is_quit_command(&line) {
                    log_debug("quit requested on stdin");
                    cancel.store(true, Ordering::Relaxed);
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        log_debug(&format!("stdin watcher unavailable: {err}"));
    }
}
