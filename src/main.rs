fn main() {
    if let Err(err) = zcp::run() {
        eprintln!("zcp: {}", err);
        std::process::exit(1);
    }
}
