//! Version command

/// Run the version command.
pub fn run() {
    println!("ingress-ssh {}", env!("CARGO_PKG_VERSION"));
}
