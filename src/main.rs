fn main() {
    if let Err(err) = stackmap::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
