//! Start-up handshake with the sandboxed command.
//!
//! `birdcage` reports a failed sandbox initialisation as exit status 1,
//! which a command can also produce. The cage therefore hands the command
//! the write end of a pipe, named by [`READY_FD_ENV`]. A command that writes
//! to it proves it was started; the read end never leaves the cage.

use std::env;
use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, OwnedFd};

use nix::fcntl::{FcntlArg, FdFlag, OFlag, fcntl};
use nix::unistd::pipe2;

use crate::error::CageError;
use crate::protocol::READY_FD_ENV;

/// Both ends of the handshake pipe, before the command is spawned.
#[derive(Debug)]
pub(crate) struct ReadyChannel {
    receiver: File,
    sender: OwnedFd,
}

impl ReadyChannel {
    /// Opens the pipe. Only the write end survives `exec`.
    pub(crate) fn open() -> Result<Self, CageError> {
        let (receiver, sender) =
            pipe2(OFlag::O_CLOEXEC | OFlag::O_NONBLOCK).map_err(CageError::ReadyChannel)?;
        fcntl(sender.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::empty()))
            .map_err(CageError::ReadyChannel)?;
        Ok(Self {
            receiver: File::from(receiver),
            sender,
        })
    }

    /// Names the write end in [`READY_FD_ENV`] for the command to inherit.
    ///
    /// Must be called from a single-threaded process.
    pub(crate) fn advertise(&self) {
        // Environment mutation is `unsafe` in edition 2024.
        unsafe { env::set_var(READY_FD_ENV, self.sender.as_raw_fd().to_string()) };
    }

    /// Drops the cage's copy of the write end once the command holds its own.
    pub(crate) fn into_receiver(self) -> ReadyReceiver {
        drop(self.sender);
        ReadyReceiver {
            receiver: self.receiver,
        }
    }
}

/// Read end kept by the cage.
#[derive(Debug)]
pub(crate) struct ReadyReceiver {
    receiver: File,
}

impl ReadyReceiver {
    /// Whether the command wrote to the channel.
    ///
    /// Only conclusive after the sandbox has been reaped, when no writer is
    /// left.
    pub(crate) fn signalled(&mut self) -> bool {
        let mut byte = [0_u8; 1];
        self.receiver.read(&mut byte).is_ok_and(|read| read > 0)
    }
}
