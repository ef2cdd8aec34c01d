fn main() {
    // Bundled configurations are embedded with include_dir
    println!("cargo:rerun-if-changed=config/");
}
