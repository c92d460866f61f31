pub mod check;
pub mod common;
pub mod normalize;

/// Map a command result to an exit code, printing the error.
pub fn run_command<F>(f: F) -> i32
where
    F: FnOnce() -> Result<i32, String>,
{
    match f() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}
