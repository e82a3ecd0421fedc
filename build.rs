#[cfg(windows)]
fn main() {
    use winres::WindowsResource;

    WindowsResource::new()
        .set("ProductName", "Patch Upscaler")
        .set("FileDescription", "Upscale images patch by patch")
        .set("LegalCopyright", "Copyright (C) 2024")
        .compile()
        .unwrap();
}

#[cfg(not(windows))]
fn main() {
    // Nothing to do on non-Windows platforms
}
