//! Progress command - demonstrates the generating-status cycler.

use anyhow::Result;
use std::io::Write;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

use crate::config::Config;

/// Cycle the status line for `ticks` intervals, then replace it with `result`
pub async fn execute(
    prefix: Option<&str>,
    ticks: u64,
    result: &str,
    config: &Config,
) -> Result<()> {
    let mut cycler = config.progress_cycler(prefix);
    let mut states = WatchStream::new(cycler.subscribe());
    let mut stdout = std::io::stdout();

    cycler.start();

    while let Some(state) = states.next().await {
        write!(stdout, "\r\x1b[2K{}", state.text)?;
        stdout.flush()?;
        if state.ticks >= ticks {
            break;
        }
    }

    cycler.replace(result);
    writeln!(stdout, "\r\x1b[2K{}", cycler.text())?;

    Ok(())
}
