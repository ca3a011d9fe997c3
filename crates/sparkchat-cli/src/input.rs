//! Line input for the chat loop.
//!
//! Blocking reads happen on a plain OS thread that feeds a channel. A read parked on a
//! terminal can never be cancelled, so it must not live on the runtime's blocking pool,
//! where shutdown would wait for it.

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;

pub type InputLines = mpsc::UnboundedReceiver<io::Result<String>>;

/// Reads `reader` line by line on a detached thread. The channel closes at end of input.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<InputLines>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("sparkchat-input".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
            log::debug!("Input reader finished");
        })?;
    Ok(rx)
}

pub fn stdin_lines() -> io::Result<InputLines> {
    spawn_line_reader(io::BufReader::new(io::stdin()))
}
