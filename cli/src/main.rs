use ijvm_core::machine::Machine;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    // Usage: ijvm <image-path>

    let image_path = match args.get(1) {
        Some(path) => path,
        None => {
            eprintln!("Usage: ijvm <image-path>");
            std::process::exit(1);
        }
    };

    let mut machine = match Machine::load(image_path) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("ijvm: {e}");
            std::process::exit(1);
        }
    };

    machine.run();

    if let Some(e) = machine.last_error() {
        eprintln!("ijvm: {e}");
        std::process::exit(1);
    }
}
