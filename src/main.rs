fn main() {
    if let Err(e) = action_recorder_lib::run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
