//! Interactive frame display for `--play`. Compiled behind the `viewer`
//! feature.

use minifb::{Key, Window, WindowOptions};

use crate::error::{Error, Result};
use crate::types::Frame;

pub struct Viewer {
    window: Window,
    buffer: Vec<u32>,
}

impl Viewer {
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self> {
        let mut window = Window::new(
            title,
            width as usize,
            height as usize,
            WindowOptions::default(),
        )
        .map_err(|err| Error::Render(err.to_string()))?;
        window.set_target_fps(30);
        Ok(Self {
            window,
            buffer: Vec::new(),
        })
    }

    /// Presents a frame. Returns `false` when the user closed the window or
    /// pressed `q`/Escape, which cancels the stream.
    pub fn show(&mut self, frame: &Frame) -> Result<bool> {
        if !self.window.is_open()
            || self.window.is_key_down(Key::Q)
            || self.window.is_key_down(Key::Escape)
        {
            return Ok(false);
        }

        self.buffer.clear();
        self.buffer.reserve(frame.rgba.len() / 4);
        for px in frame.rgba.chunks_exact(4) {
            self.buffer
                .push(((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32);
        }

        self.window
            .update_with_buffer(&self.buffer, frame.width as usize, frame.height as usize)
            .map_err(|err| Error::Render(err.to_string()))?;
        Ok(true)
    }
}
