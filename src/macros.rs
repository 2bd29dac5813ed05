//! Small helper macros shared across the crate.
//
// Macro must be defined before any modules that use it.

/// Execute a libc system call, turning a `-1` return into the last OS error.
#[allow(unused_macros)]
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ) ) => {{
        let res = unsafe { libc::$fn($($arg, )*) };
        if res == -1 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}
