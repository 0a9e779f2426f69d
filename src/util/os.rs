use std::io;

use libc::c_int;

pub fn err_no() -> c_int {
    // Falls back to EIO so that callers always have something to match on, although
    // last_os_error should never be missing its raw code.
    io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO)
}
