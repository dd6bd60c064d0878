//! Writes sample captures for manual CLI runs and fixture regeneration.
//!
//! Usage: `capture_fixtures <output-dir>`

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use dmxtap_core::CaptureBuilder;

fn main() -> ExitCode {
    let dir = match env::args().nth(1) {
        Some(dir) => dir,
        None => {
            eprintln!("usage: capture_fixtures <output-dir>");
            return ExitCode::from(2);
        }
    };

    match write_fixtures(Path::new(&dir)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn write_fixtures(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    // Three frames stepping a small rig: a dimmer ramp over the first
    // sixteen channels.
    let mut builder = CaptureBuilder::new();
    for step in 0u8..3 {
        let mut values = [0u8; 512];
        for (i, value) in values.iter_mut().enumerate().take(16) {
            *value = (step + 1).wrapping_mul(16).wrapping_add(i as u8);
        }
        builder.frame(&values);
    }
    builder.space(176);
    fs::write(dir.join("ramp.spi"), builder.build())?;
    eprintln!("wrote {}", dir.join("ramp.spi").display());

    // An idle line: all mark, no break, no frames.
    fs::write(dir.join("idle.spi"), vec![0xFF; 4096])?;
    eprintln!("wrote {}", dir.join("idle.spi").display());

    // A single all-zero frame ended by the next break, exercising the
    // early-termination shortcut.
    let mut builder = CaptureBuilder::new();
    builder.frame(&[0u8; 24]);
    builder.space(400);
    fs::write(dir.join("blackout.spi"), builder.build())?;
    eprintln!("wrote {}", dir.join("blackout.spi").display());

    Ok(())
}
