#![cfg(test)]

use std::os::fd::AsRawFd;

use super::*;

fn is_open(raw: libc::c_int) -> bool {
    // SAFETY: F_GETFD has no side effects.
    unsafe { libc::fcntl(raw, libc::F_GETFD) != -1 }
}

#[test]
fn test_pipe_transfers_bytes() {
    let pipe = Pipe::new().expect("pipe creation should succeed");

    assert_eq!(pipe.write.write(b"hello"), Ok(5));

    let mut buf = [0_u8; 16];
    let count = pipe.read.read(&mut buf).expect("read should succeed");
    assert_eq!(&buf[..count], b"hello", "Bytes should arrive in write order.");
}

#[test]
fn test_eof_after_write_end_closed() {
    let (read, write) = Pipe::new().expect("pipe creation should succeed").into_parts();
    write.write(b"x").expect("write should succeed");
    write.close().expect("close should succeed");

    let mut buf = [0_u8; 4];
    assert_eq!(read.read(&mut buf), Ok(1));
    assert_eq!(
        read.read(&mut buf), Ok(0),
        "Read end should see EOF once the only write end is closed."
    );
}

#[test]
fn test_pipe_ends_are_cloexec() {
    let pipe = Pipe::new().expect("pipe creation should succeed");
    for raw in [*pipe.read, *pipe.write] {
        // SAFETY: F_GETFD has no side effects.
        let flags = unsafe { libc::fcntl(raw, libc::F_GETFD) };
        assert!(flags & libc::FD_CLOEXEC != 0, "Pipe ends shouldn't leak into exec'd children.");
    }
}

#[test]
fn test_fd_ref_does_not_close() {
    let pipe = Pipe::new().expect("pipe creation should succeed");
    let raw = *pipe.read;
    {
        let view = pipe.read.borrow();
        assert_eq!(view.raw(), raw);
        assert_eq!(view.as_raw_fd(), raw);
        let copy = view;
        drop(copy);
    }
    assert!(is_open(raw), "Dropping a borrowed view must leave the owner's descriptor open.");
    assert_eq!(pipe.write.write(b"still usable"), Ok(12));
}

#[test]
fn test_fd_ref_of_file() {
    let file = tempfile::tempfile().expect("temp file should be created");
    let view = FdRef::of(&file);
    assert_eq!(view.raw(), file.as_raw_fd());
    assert_eq!(format!("{:?}", view), format!("FdRef({})", file.as_raw_fd()));
}

#[test]
fn test_dropping_invalid_fd() {
    // SAFETY: c_int::MAX is never open, so closing it can't affect anything else.
    let invalid = || unsafe { Fd::from_raw(libc::c_int::MAX) };

    let outside_panic = std::panic::catch_unwind(move || drop(invalid()));
    assert!(outside_panic.is_err(), "Dropping a descriptor someone else closed should panic.");

    // While already unwinding, a second panic would abort, so the error is only logged.
    let while_panicking = std::thread::spawn(move || {
        let _fd = invalid();
        panic!("unwinding with an invalid descriptor");
    }).join();
    assert!(while_panicking.is_err());
}
