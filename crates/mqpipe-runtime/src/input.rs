//! Interactive command source.
//!
//! A line-oriented scanner mapping single-character commands on an input
//! stream to state-machine commands. The character spellings stop at this
//! boundary; everything downstream works with [`Command`] values.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mqpipe_core::Error;

use crate::channel::QuitSender;
use crate::command::Command;

/// Spawn the scanner task.
///
/// End-of-input exits the scanner without issuing `End`; read errors are
/// fatal for the device and surface through its quit queue.
pub(crate) fn spawn_scanner<R>(
    reader: R,
    device: String,
    cmds: mpsc::UnboundedSender<Command>,
    quit: QuitSender,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => return,
                line = lines.next_line() => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => return,
                Err(e) => {
                    let _ = quit.send(Err(Error::Io(e)));
                    return;
                }
            };
            let Some(first) = line.bytes().next() else {
                continue;
            };

            let cmd = match first {
                b'i' => Some(Command::InitDevice),
                b'j' => Some(Command::InitTask),
                b'p' => Some(Command::Pause),
                b'r' => Some(Command::Run),
                b's' => Some(Command::Stop),
                b't' => Some(Command::ResetTask),
                b'd' => Some(Command::ResetDevice),
                // Help text is reserved.
                b'h' => None,
                b'q' => {
                    for cmd in [
                        Command::Stop,
                        Command::ResetTask,
                        Command::ResetDevice,
                        Command::End,
                    ] {
                        if cmds.send(cmd).is_err() {
                            break;
                        }
                    }
                    return;
                }
                _ => {
                    tracing::warn!(device = %device, input = %line, "invalid input");
                    None
                }
            };
            if let Some(cmd) = cmd {
                if cmds.send(cmd).is_err() {
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scan(input: &'static [u8]) -> Vec<Command> {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (quit_tx, _quit_rx) = mpsc::unbounded_channel();
        let handle = spawn_scanner(
            input,
            "test".to_owned(),
            cmd_tx,
            quit_tx,
            CancellationToken::new(),
        );
        handle.await.unwrap();

        let mut got = Vec::new();
        while let Ok(cmd) = cmd_rx.try_recv() {
            got.push(cmd);
        }
        got
    }

    #[tokio::test]
    async fn test_full_interactive_session() {
        let got = scan(b"i\nr\np\ns\nq\n").await;
        assert_eq!(
            got,
            vec![
                Command::InitDevice,
                Command::Run,
                Command::Pause,
                Command::Stop,
                Command::Stop,
                Command::ResetTask,
                Command::ResetDevice,
                Command::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_and_empty_lines_skipped() {
        let got = scan(b"x\n\nh\nj\nt\nd\nq\n").await;
        assert_eq!(
            got,
            vec![
                Command::InitTask,
                Command::ResetTask,
                Command::ResetDevice,
                Command::Stop,
                Command::ResetTask,
                Command::ResetDevice,
                Command::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_eof_is_not_end() {
        let got = scan(b"i\nr\n").await;
        assert_eq!(got, vec![Command::InitDevice, Command::Run]);
    }
}
