//! Headless frame capture.

use std::error::Error;
use std::fs;
use std::path::Path;

use emu_core::Machine;

use crate::nes::Nes;
use crate::ppu::{FB_HEIGHT, FB_WIDTH};

/// Save the current framebuffer as a PNG.
///
/// # Errors
///
/// Returns an error if the file cannot be created or encoded.
pub fn save_screenshot(nes: &Nes, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(writer, FB_WIDTH as u32, FB_HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(nes.framebuffer())?;
    Ok(())
}

/// Run `frames` frames and dump each as a numbered PNG under `dir/frames`.
///
/// # Errors
///
/// Returns an error if a frame cannot be saved.
pub fn record(nes: &mut Nes, dir: &Path, frames: u32) -> Result<(), Box<dyn Error>> {
    let frames_dir = dir.join("frames");
    fs::create_dir_all(&frames_dir)?;
    for i in 1..=frames {
        nes.run_frame();
        save_screenshot(nes, &frames_dir.join(format!("{i:06}.png")))?;
    }
    Ok(())
}
