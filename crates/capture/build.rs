fn main() {
    if cfg!(all(unix, not(target_os = "macos"))) {
        // Xlib is the only display backend; everything else builds the
        // synthetic source only.
        println!("cargo:rustc-cfg=x11");
    }
}
