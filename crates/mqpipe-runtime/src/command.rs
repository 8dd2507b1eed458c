//! State-machine commands.

use std::fmt;

/// An instruction driving a device's state machine.
///
/// Commands are delivered in FIFO order on the device command queue. The
/// single-character spellings understood by the interactive control source
/// live in the input scanner; everything past that boundary works with this
/// enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Initialize the device (user logic `init`).
    InitDevice,
    /// Initialize device tasks (reserved).
    InitTask,
    /// Start the user logic `run` task.
    Run,
    /// Pause the device (user logic `pause`).
    Pause,
    /// Signal the user logic to stop running.
    Stop,
    /// Reset task state (user logic `reset`).
    ResetTask,
    /// Reset device state (reserved).
    ResetDevice,
    /// Terminate the device.
    End,
    /// Terminate the device after an error was noticed.
    Error,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::InitDevice => "INIT_DEVICE",
            Command::InitTask => "INIT_TASK",
            Command::Run => "RUN",
            Command::Pause => "PAUSE",
            Command::Stop => "STOP",
            Command::ResetTask => "RESET_TASK",
            Command::ResetDevice => "RESET_DEVICE",
            Command::End => "END",
            Command::Error => "ERROR_FOUND",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(Command::InitDevice.to_string(), "INIT_DEVICE");
        assert_eq!(Command::ResetTask.to_string(), "RESET_TASK");
        assert_eq!(Command::Error.to_string(), "ERROR_FOUND");
    }
}
