fn main() {
    std::process::exit(credsweep::app::startup::startup());
}
