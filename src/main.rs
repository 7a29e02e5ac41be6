use std::process;

fn main() {
    if let Err(err) = rowpipe::app::run() {
        eprintln!("fatal: {err}");
        process::exit(1);
    }
}
