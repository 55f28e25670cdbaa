fn main() {
    if let Err(err) = sleeptracker_lib::run() {
        eprintln!("sleeptracker: {err:#}");
        std::process::exit(1);
    }
}
